//! The OpenXR side of the bridge.
//!
//! [`XrRuntime`] is the narrow set of OpenXR entry points the bridge forwards
//! to. [`OpenXrRuntime`] implements it over a live `openxr::Instance`; tests
//! substitute a recording fake.

use ash::vk;
use ash::vk::Handle;
use openxr as xr;
use openxr::sys;
use openxr::sys::Handle as _;

#[cfg(target_os = "windows")]
use crate::types::AdapterLuid;
use crate::types::{D3d12Requirements, VulkanRequirements};

/// Result of a raw OpenXR call: the error side carries the failing code.
pub type XrResult<T> = std::result::Result<T, sys::Result>;

/// OpenXR entry points consumed by the bridge, in their native shapes.
///
/// Calls are synchronous and may block inside the runtime.
pub trait XrRuntime: Send + Sync {
    fn create_session(
        &self,
        instance: sys::Instance,
        create_info: &sys::SessionCreateInfo,
    ) -> XrResult<sys::Session>;

    fn destroy_session(&self, session: sys::Session) -> XrResult<()>;

    /// # Safety
    ///
    /// `formats` is null or valid for `capacity` writes.
    unsafe fn enumerate_swapchain_formats(
        &self,
        session: sys::Session,
        capacity: u32,
        count_output: &mut u32,
        formats: *mut i64,
    ) -> XrResult<()>;

    fn create_swapchain(
        &self,
        session: sys::Session,
        create_info: &sys::SwapchainCreateInfo,
    ) -> XrResult<sys::Swapchain>;

    fn destroy_swapchain(&self, swapchain: sys::Swapchain) -> XrResult<()>;

    /// # Safety
    ///
    /// `images` is null or points to `capacity` image structs of one type,
    /// each with its `ty` set.
    unsafe fn enumerate_swapchain_images(
        &self,
        swapchain: sys::Swapchain,
        capacity: u32,
        count_output: &mut u32,
        images: *mut sys::SwapchainImageBaseHeader,
    ) -> XrResult<()>;

    /// `xrGetD3D12GraphicsRequirementsKHR`
    fn d3d12_graphics_requirements(
        &self,
        instance: sys::Instance,
        system_id: sys::SystemId,
    ) -> XrResult<D3d12Requirements>;

    /// `xrGetVulkanGraphicsRequirements2KHR`
    fn vulkan_graphics_requirements(
        &self,
        instance: sys::Instance,
        system_id: sys::SystemId,
    ) -> XrResult<VulkanRequirements>;

    /// `xrCreateVulkanInstanceKHR`. The inner result is the Vulkan status the
    /// runtime got back from `vkCreateInstance`.
    ///
    /// # Safety
    ///
    /// `create_info` must be a valid `VkInstanceCreateInfo` chain.
    unsafe fn create_vulkan_instance(
        &self,
        instance: sys::Instance,
        system_id: sys::SystemId,
        get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
        create_info: *const vk::InstanceCreateInfo<'_>,
    ) -> XrResult<Result<vk::Instance, vk::Result>>;

    /// `xrGetVulkanGraphicsDevice2KHR`
    fn vulkan_graphics_device(
        &self,
        instance: sys::Instance,
        system_id: sys::SystemId,
        vk_instance: vk::Instance,
    ) -> XrResult<vk::PhysicalDevice>;

    /// `xrCreateVulkanDeviceKHR`
    ///
    /// # Safety
    ///
    /// `create_info` must be a valid `VkDeviceCreateInfo` chain for
    /// `physical_device`.
    unsafe fn create_vulkan_device(
        &self,
        instance: sys::Instance,
        system_id: sys::SystemId,
        get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
        physical_device: vk::PhysicalDevice,
        create_info: *const vk::DeviceCreateInfo<'_>,
    ) -> XrResult<Result<vk::Device, vk::Result>>;
}

pub(crate) fn check(result: sys::Result) -> XrResult<()> {
    if result.into_raw() < 0 {
        Err(result)
    } else {
        Ok(())
    }
}

/// [`XrRuntime`] over a live OpenXR instance.
///
/// Core calls go through the instance's function table; the backend
/// extension entry points are the ones the `openxr` crate resolved by name
/// when the instance was created, so the matching enable extension
/// (`XR_KHR_D3D12_enable` or `XR_KHR_vulkan_enable2`) must have been requested.
#[derive(Clone)]
pub struct OpenXrRuntime {
    instance: xr::Instance,
}

impl OpenXrRuntime {
    pub fn new(instance: xr::Instance) -> Self {
        Self { instance }
    }

    pub fn instance(&self) -> &xr::Instance {
        &self.instance
    }

    fn expect_instance(&self, instance: sys::Instance) -> XrResult<()> {
        if instance == self.instance.as_raw() {
            Ok(())
        } else {
            Err(sys::Result::ERROR_HANDLE_INVALID)
        }
    }
}

impl std::fmt::Debug for OpenXrRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenXrRuntime")
            .field("instance", &self.instance.as_raw())
            .finish()
    }
}

impl XrRuntime for OpenXrRuntime {
    fn create_session(
        &self,
        instance: sys::Instance,
        create_info: &sys::SessionCreateInfo,
    ) -> XrResult<sys::Session> {
        let mut session = sys::Session::NULL;
        check(unsafe { (self.instance.fp().create_session)(instance, create_info, &mut session) })?;
        Ok(session)
    }

    fn destroy_session(&self, session: sys::Session) -> XrResult<()> {
        check(unsafe { (self.instance.fp().destroy_session)(session) })
    }

    unsafe fn enumerate_swapchain_formats(
        &self,
        session: sys::Session,
        capacity: u32,
        count_output: &mut u32,
        formats: *mut i64,
    ) -> XrResult<()> {
        check((self.instance.fp().enumerate_swapchain_formats)(
            session,
            capacity,
            count_output,
            formats,
        ))
    }

    fn create_swapchain(
        &self,
        session: sys::Session,
        create_info: &sys::SwapchainCreateInfo,
    ) -> XrResult<sys::Swapchain> {
        let mut swapchain = sys::Swapchain::NULL;
        check(unsafe {
            (self.instance.fp().create_swapchain)(session, create_info, &mut swapchain)
        })?;
        Ok(swapchain)
    }

    fn destroy_swapchain(&self, swapchain: sys::Swapchain) -> XrResult<()> {
        check(unsafe { (self.instance.fp().destroy_swapchain)(swapchain) })
    }

    unsafe fn enumerate_swapchain_images(
        &self,
        swapchain: sys::Swapchain,
        capacity: u32,
        count_output: &mut u32,
        images: *mut sys::SwapchainImageBaseHeader,
    ) -> XrResult<()> {
        check((self.instance.fp().enumerate_swapchain_images)(
            swapchain,
            capacity,
            count_output,
            images,
        ))
    }

    #[cfg(target_os = "windows")]
    fn d3d12_graphics_requirements(
        &self,
        instance: sys::Instance,
        system_id: sys::SystemId,
    ) -> XrResult<D3d12Requirements> {
        self.expect_instance(instance)?;
        let reqs = self.instance.graphics_requirements::<xr::D3D12>(system_id)?;
        Ok(D3d12Requirements {
            adapter_luid: AdapterLuid {
                low_part: reqs.adapter_luid.LowPart,
                high_part: reqs.adapter_luid.HighPart,
            },
            min_feature_level: reqs.min_feature_level as u32,
        })
    }

    #[cfg(not(target_os = "windows"))]
    fn d3d12_graphics_requirements(
        &self,
        instance: sys::Instance,
        _system_id: sys::SystemId,
    ) -> XrResult<D3d12Requirements> {
        self.expect_instance(instance)?;
        Err(sys::Result::ERROR_EXTENSION_NOT_PRESENT)
    }

    fn vulkan_graphics_requirements(
        &self,
        instance: sys::Instance,
        system_id: sys::SystemId,
    ) -> XrResult<VulkanRequirements> {
        self.expect_instance(instance)?;
        let reqs = self.instance.graphics_requirements::<xr::Vulkan>(system_id)?;
        Ok(VulkanRequirements {
            min_api_version: reqs.min_api_version_supported.into(),
            max_api_version: reqs.max_api_version_supported.into(),
        })
    }

    unsafe fn create_vulkan_instance(
        &self,
        instance: sys::Instance,
        system_id: sys::SystemId,
        get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
        create_info: *const vk::InstanceCreateInfo<'_>,
    ) -> XrResult<Result<vk::Instance, vk::Result>> {
        self.expect_instance(instance)?;
        #[allow(clippy::missing_transmute_annotations)]
        let created = self.instance.create_vulkan_instance(
            system_id,
            std::mem::transmute(get_instance_proc_addr),
            create_info.cast(),
        )?;
        Ok(created
            .map(|raw| vk::Instance::from_raw(raw as u64))
            .map_err(vk::Result::from_raw))
    }

    fn vulkan_graphics_device(
        &self,
        instance: sys::Instance,
        system_id: sys::SystemId,
        vk_instance: vk::Instance,
    ) -> XrResult<vk::PhysicalDevice> {
        self.expect_instance(instance)?;
        let raw = unsafe {
            self.instance
                .vulkan_graphics_device(system_id, vk_instance.as_raw() as *const _)
        }?;
        Ok(vk::PhysicalDevice::from_raw(raw as u64))
    }

    unsafe fn create_vulkan_device(
        &self,
        instance: sys::Instance,
        system_id: sys::SystemId,
        get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
        physical_device: vk::PhysicalDevice,
        create_info: *const vk::DeviceCreateInfo<'_>,
    ) -> XrResult<Result<vk::Device, vk::Result>> {
        self.expect_instance(instance)?;
        #[allow(clippy::missing_transmute_annotations)]
        let created = self.instance.create_vulkan_device(
            system_id,
            std::mem::transmute(get_instance_proc_addr),
            physical_device.as_raw() as *const _,
            create_info.cast(),
        )?;
        Ok(created
            .map(|raw| vk::Device::from_raw(raw as u64))
            .map_err(vk::Result::from_raw))
    }
}
