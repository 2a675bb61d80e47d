use std::ffi::c_void;
use std::ptr;

use ash::vk::{self, Handle};
use openxr::sys;
use tracing::info;

use super::NativeSwapchainImage;
use crate::error::{Error, Result};
use crate::gpu::{GpuDevice, NativeDeviceHandles, NativeImage};
use crate::runtime::XrRuntime;
use crate::types::native::{VulkanGraphicsBinding, VulkanSwapchainImage, VK_FORMAT_B8G8R8A8_SRGB};
use crate::types::Backend;

impl NativeSwapchainImage for VulkanSwapchainImage {
    const BACKEND: Backend = Backend::Vulkan;
    const NATIVE_FORMAT: i64 = VK_FORMAT_B8G8R8A8_SRGB;
    const USAGE: wgpu::TextureUsages = wgpu::TextureUsages::RENDER_ATTACHMENT;

    fn native_image(&self) -> NativeImage {
        NativeImage::Vulkan(vk::Image::from_raw(self.image))
    }
}

/// Session created through `XrGraphicsBindingVulkan2KHR`.
#[derive(Debug)]
pub struct VulkanSession<D> {
    handle: sys::Session,
    device: D,
}

impl<D: GpuDevice> VulkanSession<D> {
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
        super::create_swapchain::<VulkanSwapchainImage, R, D>(
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
) -> Result<VulkanSession<D>> {
    if create_info.ty != sys::StructureType::SESSION_CREATE_INFO {
        return Err(Error::HandleInvalid("XrSessionCreateInfo"));
    }
    let NativeDeviceHandles::Vulkan {
        instance: vk_instance,
        physical_device,
        device: vk_device,
        queue_family_index,
        queue_index,
    } = device.native_handles()?
    else {
        return Err(Error::runtime_failure("device did not report Vulkan handles"));
    };

    let binding = VulkanGraphicsBinding {
        ty: sys::StructureType::GRAPHICS_BINDING_VULKAN_KHR,
        next: ptr::null(),
        instance: vk_instance.as_raw() as *const c_void,
        physical_device: physical_device.as_raw() as *const c_void,
        device: vk_device.as_raw() as *const c_void,
        queue_family_index,
        queue_index,
    };
    let session_info = sys::SessionCreateInfo {
        ty: sys::StructureType::SESSION_CREATE_INFO,
        next: ptr::addr_of!(binding).cast(),
        create_flags: create_info.create_flags,
        system_id: create_info.system_id,
    };
    let handle = runtime.create_session(instance, &session_info)?;
    info!(?handle, queue_family_index, "created Vulkan session");

    Ok(VulkanSession {
        handle,
        device: device.clone(),
    })
}
