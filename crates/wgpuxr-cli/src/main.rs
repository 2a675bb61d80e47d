//! wgpuxr diagnostics: OpenXR graphics requirements and bridged swapchain formats.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use openxr as xr;
use serde::Serialize;
use tracing::{debug, info};
use wgpuxr::types::{format_from_code, ApiVersion};
use wgpuxr::{Backend, GraphicsRequirements, OpenXrRuntime, BGRA8_UNORM_SRGB};

#[derive(Parser, Debug)]
#[command(name = "wgpuxr")]
#[command(about = "wgpuxr diagnostics")]
struct Args {
    /// Graphics backend to query (vulkan or d3d12)
    #[arg(long, global = true, env = "WGPUXR_BACKEND", default_value_t = default_backend())]
    backend: Backend,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask the active OpenXR runtime for its graphics requirements
    Requirements {
        /// Application name reported to the runtime
        #[arg(long, env = "WGPUXR_APP_NAME", default_value = "wgpuxr")]
        app_name: String,
    },

    /// List the swapchain formats bridged sessions report
    Formats,

    /// Show version information
    Version,
}

fn default_backend() -> Backend {
    if cfg!(target_os = "windows") {
        Backend::D3d12
    } else {
        Backend::Vulkan
    }
}

#[derive(Debug, Serialize)]
struct RequirementsReport {
    runtime_name: String,
    runtime_version: ApiVersion,
    system_name: String,
    requirements: GraphicsRequirements,
}

#[derive(Debug, Serialize)]
struct FormatReport {
    backend: Backend,
    format: String,
    code: i64,
    native_code: i64,
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn query_requirements(backend: Backend, app_name: &str) -> Result<RequirementsReport> {
    let entry = unsafe { xr::Entry::load() }.context("failed to load the OpenXR loader")?;
    let available = entry
        .enumerate_extensions()
        .context("failed to enumerate OpenXR extensions")?;

    let mut exts = xr::ExtensionSet::default();
    match backend {
        Backend::Vulkan => {
            if !available.khr_vulkan_enable2 {
                bail!("OpenXR runtime does not support XR_KHR_vulkan_enable2");
            }
            exts.khr_vulkan_enable2 = true;
        }
        #[cfg(windows)]
        Backend::D3d12 => {
            if !available.khr_d3d12_enable {
                bail!("OpenXR runtime does not support XR_KHR_D3D12_enable");
            }
            exts.khr_d3d12_enable = true;
        }
        // openxr only exposes XR_KHR_D3D12_enable on Windows.
        #[cfg(not(windows))]
        Backend::D3d12 => {
            bail!("OpenXR runtime does not support XR_KHR_D3D12_enable");
        }
    }

    let app_info = xr::ApplicationInfo {
        application_name: app_name,
        application_version: 1,
        engine_name: "wgpuxr",
        engine_version: 1,
        api_version: xr::Version::new(1, 0, 0),
    };
    let instance = entry
        .create_instance(&app_info, &exts, &[])
        .context("failed to create OpenXR instance")?;
    let properties = instance
        .properties()
        .context("failed to read OpenXR instance properties")?;
    debug!(runtime = %properties.runtime_name, "OpenXR instance created");

    let system = instance
        .system(xr::FormFactor::HEAD_MOUNTED_DISPLAY)
        .context("no head-mounted display system available")?;
    let system_properties = instance
        .system_properties(system)
        .context("failed to read OpenXR system properties")?;

    let runtime = OpenXrRuntime::new(instance.clone());
    let requirements =
        wgpuxr::graphics_requirements(&runtime, instance.as_raw(), system, backend.to_wgpu())
            .with_context(|| format!("failed to query {backend} graphics requirements"))?;
    info!(%backend, system = %system_properties.system_name, "queried graphics requirements");

    Ok(RequirementsReport {
        runtime_name: properties.runtime_name,
        runtime_version: properties.runtime_version.into(),
        system_name: system_properties.system_name,
        requirements,
    })
}

fn format_report(backend: Backend) -> FormatReport {
    let format = format_from_code(BGRA8_UNORM_SRGB)
        .map(|format| format!("{format:?}"))
        .unwrap_or_else(|| "unknown".to_string());
    FormatReport {
        backend,
        format,
        code: BGRA8_UNORM_SRGB,
        native_code: backend.native_swapchain_format(),
    }
}

fn print_requirements(report: &RequirementsReport) {
    println!(
        "Runtime:  {} {}",
        report.runtime_name, report.runtime_version
    );
    println!("System:   {}", report.system_name);
    match &report.requirements {
        GraphicsRequirements::D3d12(reqs) => {
            println!("Backend:  d3d12");
            println!("Adapter:  {}", reqs.adapter_luid);
            println!("Feature level: {:#x}", reqs.min_feature_level);
        }
        GraphicsRequirements::Vulkan(reqs) => {
            println!("Backend:  vulkan");
            println!(
                "Vulkan API: {} - {}",
                reqs.min_api_version, reqs.max_api_version
            );
        }
    }
}

fn main() -> Result<()> {
    init_tracing();

    let args = Args::parse();

    match args.command {
        Command::Requirements { app_name } => {
            let report = query_requirements(args.backend, &app_name)?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_requirements(&report);
            }
        }
        Command::Formats => {
            let report = format_report(args.backend);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&[&report])?);
            } else {
                println!(
                    "{}: {} (code {:#x}, native {})",
                    report.backend, report.format, report.code, report.native_code
                );
            }
        }
        Command::Version => {
            println!("wgpuxr {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
