//! Minimal runtime and device stand-ins for unit tests.

use std::ffi::c_void;
use std::sync::atomic::{AtomicU64, Ordering};

use ash::vk::{self, Handle};
use openxr::sys;
use openxr::sys::Handle as _;

use crate::error::Result;
use crate::gpu::{GpuDevice, NativeDeviceHandles, NativeImage};
use crate::runtime::{check as status, XrResult, XrRuntime};
use crate::types::{AdapterLuid, ApiVersion, D3d12Requirements, VulkanRequirements};

pub struct StubRuntime {
    pub requirements_result: sys::Result,
    pub hook_xr_result: sys::Result,
    pub hook_vk_result: vk::Result,
    pub next_session: AtomicU64,
}

impl StubRuntime {
    pub fn vk_instance() -> vk::Instance {
        vk::Instance::from_raw(0x100)
    }

    pub fn vk_physical_device() -> vk::PhysicalDevice {
        vk::PhysicalDevice::from_raw(0x200)
    }

    pub fn vk_device() -> vk::Device {
        vk::Device::from_raw(0x300)
    }

    pub fn instance(&self) -> sys::Instance {
        sys::Instance::from_raw(1)
    }

    fn vk_outcome<T>(&self, value: T) -> XrResult<std::result::Result<T, vk::Result>> {
        status(self.hook_xr_result)?;
        if self.hook_vk_result == vk::Result::SUCCESS {
            Ok(Ok(value))
        } else {
            Ok(Err(self.hook_vk_result))
        }
    }
}

impl Default for StubRuntime {
    fn default() -> Self {
        Self {
            requirements_result: sys::Result::SUCCESS,
            hook_xr_result: sys::Result::SUCCESS,
            hook_vk_result: vk::Result::SUCCESS,
            next_session: AtomicU64::new(1),
        }
    }
}

impl XrRuntime for StubRuntime {
    fn create_session(
        &self,
        _instance: sys::Instance,
        _create_info: &sys::SessionCreateInfo,
    ) -> XrResult<sys::Session> {
        Ok(sys::Session::from_raw(self.next_session.load(Ordering::SeqCst)))
    }

    fn destroy_session(&self, _session: sys::Session) -> XrResult<()> {
        Ok(())
    }

    unsafe fn enumerate_swapchain_formats(
        &self,
        _session: sys::Session,
        _capacity: u32,
        _count_output: &mut u32,
        _formats: *mut i64,
    ) -> XrResult<()> {
        Err(sys::Result::ERROR_FUNCTION_UNSUPPORTED)
    }

    fn create_swapchain(
        &self,
        _session: sys::Session,
        _create_info: &sys::SwapchainCreateInfo,
    ) -> XrResult<sys::Swapchain> {
        Err(sys::Result::ERROR_FUNCTION_UNSUPPORTED)
    }

    fn destroy_swapchain(&self, _swapchain: sys::Swapchain) -> XrResult<()> {
        Ok(())
    }

    unsafe fn enumerate_swapchain_images(
        &self,
        _swapchain: sys::Swapchain,
        _capacity: u32,
        _count_output: &mut u32,
        _images: *mut sys::SwapchainImageBaseHeader,
    ) -> XrResult<()> {
        Err(sys::Result::ERROR_FUNCTION_UNSUPPORTED)
    }

    fn d3d12_graphics_requirements(
        &self,
        _instance: sys::Instance,
        _system_id: sys::SystemId,
    ) -> XrResult<D3d12Requirements> {
        status(self.requirements_result)?;
        Ok(D3d12Requirements {
            adapter_luid: AdapterLuid {
                low_part: 7,
                high_part: 0,
            },
            min_feature_level: 0xb000,
        })
    }

    fn vulkan_graphics_requirements(
        &self,
        _instance: sys::Instance,
        _system_id: sys::SystemId,
    ) -> XrResult<VulkanRequirements> {
        status(self.requirements_result)?;
        Ok(VulkanRequirements {
            min_api_version: ApiVersion {
                major: 1,
                minor: 0,
                patch: 0,
            },
            max_api_version: ApiVersion {
                major: 1,
                minor: 3,
                patch: 0,
            },
        })
    }

    unsafe fn create_vulkan_instance(
        &self,
        _instance: sys::Instance,
        _system_id: sys::SystemId,
        _get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
        _create_info: *const vk::InstanceCreateInfo<'_>,
    ) -> XrResult<std::result::Result<vk::Instance, vk::Result>> {
        self.vk_outcome(Self::vk_instance())
    }

    fn vulkan_graphics_device(
        &self,
        _instance: sys::Instance,
        _system_id: sys::SystemId,
        _vk_instance: vk::Instance,
    ) -> XrResult<vk::PhysicalDevice> {
        status(self.hook_xr_result)?;
        Ok(Self::vk_physical_device())
    }

    unsafe fn create_vulkan_device(
        &self,
        _instance: sys::Instance,
        _system_id: sys::SystemId,
        _get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
        _physical_device: vk::PhysicalDevice,
        _create_info: *const vk::DeviceCreateInfo<'_>,
    ) -> XrResult<std::result::Result<vk::Device, vk::Result>> {
        self.vk_outcome(Self::vk_device())
    }
}

/// Device whose views are the raw native image values.
#[derive(Debug, Clone)]
pub struct StubDevice {
    backend: wgpu::Backend,
}

impl StubDevice {
    pub fn vulkan() -> Self {
        Self {
            backend: wgpu::Backend::Vulkan,
        }
    }
}

impl GpuDevice for StubDevice {
    type TextureView = u64;

    fn backend(&self) -> wgpu::Backend {
        self.backend
    }

    fn native_handles(&self) -> Result<NativeDeviceHandles> {
        Ok(match self.backend {
            wgpu::Backend::Dx12 => NativeDeviceHandles::D3d12 {
                device: 0x10 as *mut c_void,
                queue: 0x20 as *mut c_void,
            },
            _ => NativeDeviceHandles::Vulkan {
                instance: StubRuntime::vk_instance(),
                physical_device: StubRuntime::vk_physical_device(),
                device: StubRuntime::vk_device(),
                queue_family_index: 0,
                queue_index: 0,
            },
        })
    }

    unsafe fn import_texture(
        &self,
        image: NativeImage,
        _desc: &wgpu::TextureDescriptor<'_>,
    ) -> Result<u64> {
        Ok(match image {
            NativeImage::Vulkan(image) => image.as_raw(),
            NativeImage::D3d12(texture) => texture as u64,
        })
    }
}
