use std::ptr;

use openxr::sys;
use tracing::info;

use super::NativeSwapchainImage;
use crate::error::{Error, Result};
use crate::gpu::{GpuDevice, NativeDeviceHandles, NativeImage};
use crate::runtime::XrRuntime;
use crate::types::native::{
    D3d12GraphicsBinding, D3d12SwapchainImage, DXGI_FORMAT_B8G8R8A8_UNORM_SRGB,
};
use crate::types::Backend;

impl NativeSwapchainImage for D3d12SwapchainImage {
    const BACKEND: Backend = Backend::D3d12;
    const NATIVE_FORMAT: i64 = DXGI_FORMAT_B8G8R8A8_UNORM_SRGB;
    // Sampled later by compositing passes.
    const USAGE: wgpu::TextureUsages = wgpu::TextureUsages::RENDER_ATTACHMENT
        .union(wgpu::TextureUsages::TEXTURE_BINDING);

    fn native_image(&self) -> NativeImage {
        NativeImage::D3d12(self.texture)
    }
}

/// Session created through `XrGraphicsBindingD3D12KHR`.
#[derive(Debug)]
pub struct D3d12Session<D> {
    handle: sys::Session,
    device: D,
}

impl<D: GpuDevice> D3d12Session<D> {
    pub fn handle(&self) -> sys::Session {
        self.handle
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn create_swapchain<R: XrRuntime + ?Sized>(
        &self,
        runtime: &R,
        create_info: &sys::SwapchainCreateInfo,
    ) -> Result<(Vec<D::TextureView>, sys::Swapchain)> {
        super::create_swapchain::<D3d12SwapchainImage, R, D>(
            runtime,
            self.handle,
            &self.device,
            create_info,
        )
    }
}

pub fn create_session<R: XrRuntime + ?Sized, D: GpuDevice>(
    runtime: &R,
    instance: sys::Instance,
    create_info: &sys::SessionCreateInfo,
    device: &D,
) -> Result<D3d12Session<D>> {
    if create_info.ty != sys::StructureType::SESSION_CREATE_INFO {
        return Err(Error::HandleInvalid("XrSessionCreateInfo"));
    }
    let NativeDeviceHandles::D3d12 {
        device: d3d12_device,
        queue,
    } = device.native_handles()?
    else {
        return Err(Error::runtime_failure("device did not report D3D12 handles"));
    };

    let binding = D3d12GraphicsBinding {
        ty: sys::StructureType::GRAPHICS_BINDING_D3D12_KHR,
        next: ptr::null(),
        device: d3d12_device,
        queue,
    };
    let session_info = sys::SessionCreateInfo {
        ty: sys::StructureType::SESSION_CREATE_INFO,
        next: ptr::addr_of!(binding).cast(),
        create_flags: create_info.create_flags,
        system_id: create_info.system_id,
    };
    let handle = runtime.create_session(instance, &session_info)?;
    info!(?handle, "created D3D12 session");

    Ok(D3d12Session {
        handle,
        device: device.clone(),
    })
}
