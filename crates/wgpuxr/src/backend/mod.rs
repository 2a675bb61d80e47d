//! Per-backend OpenXR sessions over a GPU device.
//!
//! A session owns the runtime's session handle and a clone of the device it
//! was created for. Swapchain creation asks the runtime for native images and
//! imports each one into the device without copying.

use std::ptr;

use openxr::sys;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::gpu::{GpuDevice, NativeImage};
use crate::runtime::XrRuntime;
use crate::types::{Backend, BGRA8_UNORM_SRGB, SWAPCHAIN_FORMAT};

pub mod d3d12;
pub mod vulkan;

pub use d3d12::D3d12Session;
pub use vulkan::VulkanSession;

/// A bridged session; the variant is fixed by the device's backend.
#[derive(Debug)]
pub enum BackendSession<D> {
    D3d12(D3d12Session<D>),
    Vulkan(VulkanSession<D>),
}

impl<D: GpuDevice> BackendSession<D> {
    /// Create a runtime session bound to `device`, picking the backend from
    /// the device itself.
    pub fn create<R: XrRuntime + ?Sized>(
        runtime: &R,
        instance: sys::Instance,
        create_info: &sys::SessionCreateInfo,
        device: &D,
    ) -> Result<Self> {
        match device.backend() {
            wgpu::Backend::Dx12 => {
                d3d12::create_session(runtime, instance, create_info, device).map(Self::D3d12)
            }
            wgpu::Backend::Vulkan => {
                vulkan::create_session(runtime, instance, create_info, device).map(Self::Vulkan)
            }
            other => Err(Error::UnsupportedBackend(other)),
        }
    }

    pub fn handle(&self) -> sys::Session {
        match self {
            Self::D3d12(session) => session.handle(),
            Self::Vulkan(session) => session.handle(),
        }
    }

    pub fn device(&self) -> &D {
        match self {
            Self::D3d12(session) => session.device(),
            Self::Vulkan(session) => session.device(),
        }
    }

    pub fn backend(&self) -> Backend {
        match self {
            Self::D3d12(_) => Backend::D3d12,
            Self::Vulkan(_) => Backend::Vulkan,
        }
    }

    /// Swapchain formats as `webgpu.h` codes. Always exactly one entry.
    pub fn enumerate_swapchain_formats(&self) -> Vec<i64> {
        vec![BGRA8_UNORM_SRGB]
    }

    pub fn create_swapchain<R: XrRuntime + ?Sized>(
        &self,
        runtime: &R,
        create_info: &sys::SwapchainCreateInfo,
    ) -> Result<(Vec<D::TextureView>, sys::Swapchain)> {
        match self {
            Self::D3d12(session) => session.create_swapchain(runtime, create_info),
            Self::Vulkan(session) => session.create_swapchain(runtime, create_info),
        }
    }
}

/// A backend's native swapchain image struct and the import facts tied to it.
pub(crate) trait NativeSwapchainImage: Copy + Default {
    const BACKEND: Backend;
    /// Native pixel format enumerator substituted into `XrSwapchainCreateInfo`.
    const NATIVE_FORMAT: i64;
    const USAGE: wgpu::TextureUsages;

    fn native_image(&self) -> NativeImage;
}

/// Descriptor every swapchain image is imported with.
pub(crate) fn swapchain_texture_descriptor(
    create_info: &sys::SwapchainCreateInfo,
    usage: wgpu::TextureUsages,
) -> wgpu::TextureDescriptor<'static> {
    wgpu::TextureDescriptor {
        label: Some("wgpuxr swapchain image"),
        size: wgpu::Extent3d {
            width: create_info.width,
            height: create_info.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: create_info.mip_count,
        sample_count: create_info.sample_count,
        dimension: wgpu::TextureDimension::D2,
        format: SWAPCHAIN_FORMAT,
        usage,
        view_formats: &[],
    }
}

/// Shared swapchain path for both backends.
///
/// If anything fails after the runtime created the swapchain, the imported
/// views are dropped and the swapchain is destroyed before returning.
pub(crate) fn create_swapchain<I, R, D>(
    runtime: &R,
    session: sys::Session,
    device: &D,
    create_info: &sys::SwapchainCreateInfo,
) -> Result<(Vec<D::TextureView>, sys::Swapchain)>
where
    I: NativeSwapchainImage,
    R: XrRuntime + ?Sized,
    D: GpuDevice,
{
    if create_info.ty != sys::StructureType::SWAPCHAIN_CREATE_INFO {
        return Err(Error::HandleInvalid("XrSwapchainCreateInfo"));
    }
    if create_info.format != BGRA8_UNORM_SRGB {
        return Err(Error::runtime_failure(format!(
            "unsupported swapchain format {:#x}",
            create_info.format
        )));
    }

    let native_info = sys::SwapchainCreateInfo {
        format: I::NATIVE_FORMAT,
        ..*create_info
    };
    let swapchain = runtime.create_swapchain(session, &native_info)?;

    match import_images::<I, R, D>(runtime, swapchain, device, create_info) {
        Ok(views) => {
            info!(
                backend = %I::BACKEND,
                ?swapchain,
                width = create_info.width,
                height = create_info.height,
                images = views.len(),
                "created swapchain"
            );
            Ok((views, swapchain))
        }
        Err(err) => {
            if let Err(code) = runtime.destroy_swapchain(swapchain) {
                warn!(?swapchain, %code, "failed to destroy swapchain after import error");
            }
            Err(err)
        }
    }
}

fn import_images<I, R, D>(
    runtime: &R,
    swapchain: sys::Swapchain,
    device: &D,
    create_info: &sys::SwapchainCreateInfo,
) -> Result<Vec<D::TextureView>>
where
    I: NativeSwapchainImage,
    R: XrRuntime + ?Sized,
    D: GpuDevice,
{
    let mut count = 0;
    unsafe { runtime.enumerate_swapchain_images(swapchain, 0, &mut count, ptr::null_mut()) }?;

    let mut images = vec![I::default(); count as usize];
    let mut written = 0;
    unsafe {
        runtime.enumerate_swapchain_images(
            swapchain,
            count,
            &mut written,
            images.as_mut_ptr().cast(),
        )
    }?;
    if written != count {
        return Err(Error::runtime_failure(format!(
            "swapchain image count changed from {count} to {written}"
        )));
    }
    debug!(?swapchain, count, "enumerated native swapchain images");

    let desc = swapchain_texture_descriptor(create_info, I::USAGE);
    images
        .iter()
        .map(|image| unsafe { device.import_texture(image.native_image(), &desc) })
        .collect()
}
