//! Graphics requirements negotiation.
//!
//! OpenXR runtimes refuse to create a session until the application has asked
//! for the backend's graphics requirements, so this runs before every bridged
//! session creation as well as on demand.

use openxr::sys;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::runtime::XrRuntime;
use crate::types::GraphicsRequirements;

/// Query the runtime's minimums for `backend` on `system_id`.
pub fn graphics_requirements<R: XrRuntime + ?Sized>(
    runtime: &R,
    instance: sys::Instance,
    system_id: sys::SystemId,
    backend: wgpu::Backend,
) -> Result<GraphicsRequirements> {
    debug!(?backend, ?system_id, "querying graphics requirements");
    let reqs = match backend {
        wgpu::Backend::Dx12 => {
            let reqs = runtime.d3d12_graphics_requirements(instance, system_id)?;
            info!(
                adapter_luid = %reqs.adapter_luid,
                min_feature_level = format_args!("{:#x}", reqs.min_feature_level),
                "D3D12 graphics requirements"
            );
            GraphicsRequirements::D3d12(reqs)
        }
        wgpu::Backend::Vulkan => {
            let reqs = runtime.vulkan_graphics_requirements(instance, system_id)?;
            info!(
                min_api_version = %reqs.min_api_version,
                max_api_version = %reqs.max_api_version,
                "Vulkan graphics requirements"
            );
            GraphicsRequirements::Vulkan(reqs)
        }
        other => return Err(Error::UnsupportedBackend(other)),
    };
    Ok(reqs)
}
