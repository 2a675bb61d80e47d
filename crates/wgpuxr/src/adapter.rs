//! Adapter selection for OpenXR sessions.
//!
//! The runtime dictates which GPU a session may run on. D3D12 names the
//! adapter by LUID. Vulkan goes further and wants to create the instance and
//! device itself, so the Vulkan options are a set of hooks that route the
//! native creation calls through `XR_KHR_vulkan_enable2`.

use std::fmt;
use std::sync::Arc;

use ash::vk;
use openxr::sys;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::requirements::graphics_requirements;
use crate::runtime::{XrResult, XrRuntime};
use crate::types::{AdapterLuid, Backend, GraphicsRequirements};

/// What a GPU layer needs to pick or build an adapter the runtime accepts.
pub enum AdapterOptions<R> {
    D3d12 { adapter_luid: AdapterLuid },
    Vulkan(VulkanAdapterHooks<R>),
}

impl<R> AdapterOptions<R> {
    pub fn backend(&self) -> Backend {
        match self {
            Self::D3d12 { .. } => Backend::D3d12,
            Self::Vulkan(_) => Backend::Vulkan,
        }
    }
}

impl<R> fmt::Debug for AdapterOptions<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::D3d12 { adapter_luid } => f
                .debug_struct("D3d12")
                .field("adapter_luid", adapter_luid)
                .finish(),
            Self::Vulkan(hooks) => f.debug_tuple("Vulkan").field(hooks).finish(),
        }
    }
}

/// Everything a Vulkan hook needs to reach the runtime.
pub struct VulkanHookContext<R> {
    pub runtime: Arc<R>,
    pub instance: sys::Instance,
    pub system_id: sys::SystemId,
}

impl<R> fmt::Debug for VulkanHookContext<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VulkanHookContext")
            .field("instance", &self.instance)
            .field("system_id", &self.system_id)
            .finish_non_exhaustive()
    }
}

pub type CreateInstanceHook<R> = unsafe fn(
    &VulkanHookContext<R>,
    vk::PFN_vkGetInstanceProcAddr,
    *const vk::InstanceCreateInfo<'_>,
) -> Result<vk::Instance>;

pub type SelectPhysicalDeviceHook<R> =
    fn(&VulkanHookContext<R>, vk::Instance) -> Result<vk::PhysicalDevice>;

pub type CreateDeviceHook<R> = unsafe fn(
    &VulkanHookContext<R>,
    vk::PFN_vkGetInstanceProcAddr,
    vk::PhysicalDevice,
    *const vk::DeviceCreateInfo<'_>,
) -> Result<vk::Device>;

/// Replacements for `vkCreateInstance`, physical device selection and
/// `vkCreateDevice`, bound to one OpenXR instance and system.
///
/// Every hook fails with [`Error::NativeCreationFailed`]. A failed OpenXR call
/// reports `VK_ERROR_UNKNOWN`; a Vulkan error the runtime got back is reported
/// as is.
pub struct VulkanAdapterHooks<R> {
    context: VulkanHookContext<R>,
    create_instance: CreateInstanceHook<R>,
    select_physical_device: SelectPhysicalDeviceHook<R>,
    create_device: CreateDeviceHook<R>,
}

impl<R: XrRuntime> VulkanAdapterHooks<R> {
    /// Hooks that forward to the runtime's `XR_KHR_vulkan_enable2` entry points.
    pub fn new(context: VulkanHookContext<R>) -> Self {
        Self {
            context,
            create_instance: xr_create_instance::<R>,
            select_physical_device: xr_select_physical_device::<R>,
            create_device: xr_create_device::<R>,
        }
    }
}

impl<R> VulkanAdapterHooks<R> {
    pub fn context(&self) -> &VulkanHookContext<R> {
        &self.context
    }

    /// # Safety
    ///
    /// `create_info` must be a valid `VkInstanceCreateInfo` chain.
    pub unsafe fn create_instance(
        &self,
        get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
        create_info: *const vk::InstanceCreateInfo<'_>,
    ) -> Result<vk::Instance> {
        (self.create_instance)(&self.context, get_instance_proc_addr, create_info)
    }

    pub fn select_physical_device(&self, instance: vk::Instance) -> Result<vk::PhysicalDevice> {
        (self.select_physical_device)(&self.context, instance)
    }

    /// # Safety
    ///
    /// `create_info` must be a valid `VkDeviceCreateInfo` chain for
    /// `physical_device`.
    pub unsafe fn create_device(
        &self,
        get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
        physical_device: vk::PhysicalDevice,
        create_info: *const vk::DeviceCreateInfo<'_>,
    ) -> Result<vk::Device> {
        (self.create_device)(
            &self.context,
            get_instance_proc_addr,
            physical_device,
            create_info,
        )
    }
}

impl<R> fmt::Debug for VulkanAdapterHooks<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VulkanAdapterHooks")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

fn native_result<T>(
    call: &str,
    result: XrResult<std::result::Result<T, vk::Result>>,
) -> Result<T> {
    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(vk_result)) => {
            warn!(call, %vk_result, "runtime reported a Vulkan error");
            Err(Error::NativeCreationFailed(vk_result))
        }
        Err(xr_result) => {
            warn!(call, %xr_result, "OpenXR call failed");
            Err(Error::NativeCreationFailed(vk::Result::ERROR_UNKNOWN))
        }
    }
}

unsafe fn xr_create_instance<R: XrRuntime>(
    ctx: &VulkanHookContext<R>,
    get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    create_info: *const vk::InstanceCreateInfo<'_>,
) -> Result<vk::Instance> {
    native_result(
        "xrCreateVulkanInstanceKHR",
        ctx.runtime.create_vulkan_instance(
            ctx.instance,
            ctx.system_id,
            get_instance_proc_addr,
            create_info,
        ),
    )
}

fn xr_select_physical_device<R: XrRuntime>(
    ctx: &VulkanHookContext<R>,
    instance: vk::Instance,
) -> Result<vk::PhysicalDevice> {
    native_result(
        "xrGetVulkanGraphicsDevice2KHR",
        ctx.runtime
            .vulkan_graphics_device(ctx.instance, ctx.system_id, instance)
            .map(Ok),
    )
}

unsafe fn xr_create_device<R: XrRuntime>(
    ctx: &VulkanHookContext<R>,
    get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
    physical_device: vk::PhysicalDevice,
    create_info: *const vk::DeviceCreateInfo<'_>,
) -> Result<vk::Device> {
    native_result(
        "xrCreateVulkanDeviceKHR",
        ctx.runtime.create_vulkan_device(
            ctx.instance,
            ctx.system_id,
            get_instance_proc_addr,
            physical_device,
            create_info,
        ),
    )
}

/// Build the adapter options for `backend`.
///
/// For D3D12 this queries the graphics requirements to learn the LUID; the
/// Vulkan hooks take ownership of `runtime` and talk to it lazily.
pub fn create_adapter_options<R: XrRuntime>(
    runtime: Arc<R>,
    instance: sys::Instance,
    system_id: sys::SystemId,
    backend: wgpu::Backend,
) -> Result<AdapterOptions<R>> {
    match backend {
        wgpu::Backend::Dx12 => {
            let reqs = graphics_requirements(runtime.as_ref(), instance, system_id, backend)?;
            let GraphicsRequirements::D3d12(reqs) = reqs else {
                return Err(Error::runtime_failure("D3D12 query returned non-D3D12 requirements"));
            };
            debug!(adapter_luid = %reqs.adapter_luid, "D3D12 adapter options");
            Ok(AdapterOptions::D3d12 {
                adapter_luid: reqs.adapter_luid,
            })
        }
        wgpu::Backend::Vulkan => {
            debug!(?system_id, "Vulkan adapter hooks");
            Ok(AdapterOptions::Vulkan(VulkanAdapterHooks::new(
                VulkanHookContext {
                    runtime,
                    instance,
                    system_id,
                },
            )))
        }
        other => Err(Error::UnsupportedBackend(other)),
    }
}

/// Pick the candidate whose LUID is `required`.
///
/// Candidates whose LUID cannot be read never match.
pub fn select_adapter_by_luid<T>(
    candidates: impl IntoIterator<Item = T>,
    required: AdapterLuid,
    luid_of: impl Fn(&T) -> Option<AdapterLuid>,
) -> Result<T> {
    candidates
        .into_iter()
        .find(|candidate| luid_of(candidate) == Some(required))
        .ok_or(Error::AdapterNotFound(required))
}
