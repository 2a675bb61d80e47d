//! [`GpuDevice`] over a `wgpu` device, with native import through `wgpu::hal`.

use tracing::info;

use crate::adapter::AdapterOptions;
use crate::error::{Error, Result};
use crate::gpu::{swapchain_view_descriptor, GpuDevice, NativeDeviceHandles, NativeImage};
use crate::runtime::XrRuntime;

/// A wgpu device plus the facts about it the bridge needs.
///
/// wgpu does not expose the backend on the device itself, so it is captured
/// from the adapter the device was requested from.
#[derive(Debug, Clone)]
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    backend: wgpu::Backend,
}

impl WgpuDevice {
    pub fn new(adapter: &wgpu::Adapter, device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            backend: adapter.get_info().backend,
        }
    }

    /// Open a device on the adapter the runtime requires.
    ///
    /// D3D12 picks the DX12 adapter whose LUID matches. Vulkan lets the
    /// runtime create the instance and device through the hooks, then wraps
    /// both in wgpu.
    ///
    /// # Safety
    ///
    /// For Vulkan, the runtime behind `options` must hand back valid objects
    /// created from the create infos it was given.
    pub unsafe fn from_adapter_options<R: XrRuntime>(
        options: &AdapterOptions<R>,
        desc: &wgpu::DeviceDescriptor<'_>,
    ) -> Result<Self> {
        let (adapter, device, queue): (wgpu::Adapter, wgpu::Device, wgpu::Queue) = match options {
            #[cfg(target_os = "windows")]
            AdapterOptions::D3d12 { adapter_luid } => d3d12::open_device(*adapter_luid, desc)?,
            #[cfg(any(target_os = "windows", target_os = "linux", target_os = "android"))]
            AdapterOptions::Vulkan(hooks) => vulkan::open_device(hooks, desc)?,
            #[allow(unreachable_patterns)]
            other => return Err(Error::UnsupportedBackend(other.backend().to_wgpu())),
        };
        let info = adapter.get_info();
        info!(adapter = %info.name, backend = ?info.backend, "opened device on runtime adapter");
        Ok(Self::new(&adapter, device, queue))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

impl GpuDevice for WgpuDevice {
    type TextureView = wgpu::TextureView;

    fn backend(&self) -> wgpu::Backend {
        self.backend
    }

    fn native_handles(&self) -> Result<NativeDeviceHandles> {
        match self.backend {
            #[cfg(any(target_os = "windows", target_os = "linux", target_os = "android"))]
            wgpu::Backend::Vulkan => vulkan::native_handles(&self.device),
            #[cfg(target_os = "windows")]
            wgpu::Backend::Dx12 => d3d12::native_handles(&self.device),
            other => Err(Error::UnsupportedBackend(other)),
        }
    }

    unsafe fn import_texture(
        &self,
        image: NativeImage,
        desc: &wgpu::TextureDescriptor<'_>,
    ) -> Result<wgpu::TextureView> {
        let texture: wgpu::Texture = match (self.backend, image) {
            #[cfg(any(target_os = "windows", target_os = "linux", target_os = "android"))]
            (wgpu::Backend::Vulkan, NativeImage::Vulkan(raw)) => {
                vulkan::import_texture(&self.device, raw, desc)?
            }
            #[cfg(target_os = "windows")]
            (wgpu::Backend::Dx12, NativeImage::D3d12(raw)) => {
                d3d12::import_texture(&self.device, raw, desc)?
            }
            (backend, image) => {
                return Err(Error::import(format!(
                    "cannot import {image:?} on a {backend:?} device"
                )))
            }
        };
        Ok(texture.create_view(&swapchain_view_descriptor(desc.format)))
    }
}

#[cfg_attr(
    not(any(target_os = "windows", target_os = "linux", target_os = "android")),
    allow(dead_code)
)]
fn hal_texture_uses(usage: wgpu::TextureUsages) -> wgpu::TextureUses {
    let mut uses = wgpu::TextureUses::empty();
    if usage.contains(wgpu::TextureUsages::RENDER_ATTACHMENT) {
        uses |= wgpu::TextureUses::COLOR_TARGET;
    }
    if usage.contains(wgpu::TextureUsages::TEXTURE_BINDING) {
        uses |= wgpu::TextureUses::RESOURCE;
    }
    if usage.contains(wgpu::TextureUsages::COPY_SRC) {
        uses |= wgpu::TextureUses::COPY_SRC;
    }
    if usage.contains(wgpu::TextureUsages::COPY_DST) {
        uses |= wgpu::TextureUses::COPY_DST;
    }
    uses
}

#[cfg(any(target_os = "windows", target_os = "linux", target_os = "android"))]
mod vulkan {
    use std::ffi::c_char;

    use ash::vk;
    use tracing::debug;
    use wgpu::hal::api::Vulkan;

    use super::hal_texture_uses;
    use crate::adapter::VulkanAdapterHooks;
    use crate::error::{Error, Result};
    use crate::gpu::NativeDeviceHandles;
    use crate::runtime::XrRuntime;

    pub(super) unsafe fn open_device<R: XrRuntime>(
        hooks: &VulkanAdapterHooks<R>,
        desc: &wgpu::DeviceDescriptor<'_>,
    ) -> Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue)> {
        let entry = ash::Entry::load().map_err(Error::device_creation)?;
        let get_instance_proc_addr = entry.static_fn().get_instance_proc_addr;
        let api_version = entry
            .try_enumerate_instance_version()
            .map_err(Error::device_creation)?
            .unwrap_or(vk::API_VERSION_1_0)
            .min(vk::API_VERSION_1_3);

        let flags = wgpu::InstanceFlags::empty();
        let instance_extensions =
            wgpu::hal::vulkan::Instance::desired_extensions(&entry, api_version, flags)
                .map_err(Error::device_creation)?;
        let instance_extension_names: Vec<*const c_char> = instance_extensions
            .iter()
            .map(|name| name.as_ptr())
            .collect();
        let app_info = vk::ApplicationInfo::default().api_version(api_version);
        let instance_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&instance_extension_names);
        let raw_instance = hooks.create_instance(get_instance_proc_addr, &instance_info)?;
        let instance = ash::Instance::load(entry.static_fn(), raw_instance);

        // With no drop callback wgpu-hal owns the instance from here on.
        let hal_instance = wgpu::hal::vulkan::Instance::from_raw(
            entry,
            instance.clone(),
            api_version,
            0,
            None,
            instance_extensions,
            flags,
            wgpu::MemoryBudgetThresholds::default(),
            false,
            None,
        )
        .map_err(|err| {
            instance.destroy_instance(None);
            Error::device_creation(err)
        })?;

        let physical_device = hooks.select_physical_device(raw_instance)?;
        let exposed = hal_instance.expose_adapter(physical_device).ok_or_else(|| {
            Error::device_creation("runtime selected a physical device wgpu cannot use")
        })?;
        let family_index = instance
            .get_physical_device_queue_family_properties(physical_device)
            .iter()
            .position(|family| family.queue_flags.contains(vk::QueueFlags::GRAPHICS))
            .ok_or_else(|| Error::device_creation("physical device has no graphics queue"))?
            as u32;
        debug!(?physical_device, family_index, "runtime selected physical device");

        let features = desc.required_features;
        let device_extensions = exposed.adapter.required_device_extensions(features);
        let mut device_features = exposed
            .adapter
            .physical_device_features(&device_extensions, features);
        let device_extension_names: Vec<*const c_char> = device_extensions
            .iter()
            .map(|name| name.as_ptr())
            .collect();
        let priorities = [1.0];
        let queue_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(family_index)
            .queue_priorities(&priorities)];
        let device_info = device_features.add_to_device_create(
            vk::DeviceCreateInfo::default()
                .queue_create_infos(&queue_infos)
                .enabled_extension_names(&device_extension_names),
        );
        let raw_device = hooks.create_device(get_instance_proc_addr, physical_device, &device_info)?;
        let device = ash::Device::load(instance.fp_v1_0(), raw_device);

        let open_device = exposed
            .adapter
            .device_from_raw(
                device,
                None,
                &device_extensions,
                features,
                &desc.memory_hints,
                family_index,
                0,
            )
            .map_err(Error::device_creation)?;

        let instance = wgpu::Instance::from_hal::<Vulkan>(hal_instance);
        let adapter = instance.create_adapter_from_hal::<Vulkan>(exposed);
        let (device, queue) = adapter
            .create_device_from_hal::<Vulkan>(open_device, desc)
            .map_err(Error::device_creation)?;
        Ok((adapter, device, queue))
    }

    pub(super) fn native_handles(device: &wgpu::Device) -> Result<NativeDeviceHandles> {
        let hal_device = unsafe { device.as_hal::<Vulkan>() }
            .ok_or_else(|| Error::import("device exposes no Vulkan HAL"))?;
        Ok(NativeDeviceHandles::Vulkan {
            instance: hal_device.shared_instance().raw_instance().handle(),
            physical_device: hal_device.raw_physical_device(),
            device: hal_device.raw_device().handle(),
            queue_family_index: hal_device.queue_family_index(),
            queue_index: 0,
        })
    }

    pub(super) unsafe fn import_texture(
        device: &wgpu::Device,
        image: vk::Image,
        desc: &wgpu::TextureDescriptor<'_>,
    ) -> Result<wgpu::Texture> {
        let hal_desc = wgpu::hal::TextureDescriptor {
            label: desc.label,
            size: desc.size,
            mip_level_count: desc.mip_level_count,
            sample_count: desc.sample_count,
            dimension: desc.dimension,
            format: desc.format,
            usage: hal_texture_uses(desc.usage),
            memory_flags: wgpu::hal::MemoryFlags::empty(),
            view_formats: desc.view_formats.to_vec(),
        };
        let hal_texture = {
            let hal_device = device
                .as_hal::<Vulkan>()
                .ok_or_else(|| Error::import("device exposes no Vulkan HAL"))?;
            // The no-op drop callback keeps wgpu from destroying the runtime's image.
            hal_device.texture_from_raw(
                image,
                &hal_desc,
                Some(Box::new(|| {})),
                wgpu::hal::vulkan::TextureMemory::External,
            )
        };
        Ok(device.create_texture_from_hal::<Vulkan>(hal_texture, desc))
    }
}

#[cfg(target_os = "windows")]
mod d3d12 {
    use std::ffi::c_void;

    use futures::executor::block_on;
    use wgpu::hal::api::Dx12;
    use windows::core::Interface;
    use windows::Win32::Graphics::Direct3D12::ID3D12Resource;

    use crate::adapter::select_adapter_by_luid;
    use crate::error::{Error, Result};
    use crate::gpu::NativeDeviceHandles;
    use crate::types::AdapterLuid;

    pub(super) fn open_device(
        required: AdapterLuid,
        desc: &wgpu::DeviceDescriptor<'_>,
    ) -> Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue)> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::DX12,
            ..Default::default()
        });
        let adapters = block_on(instance.enumerate_adapters(wgpu::Backends::DX12));
        let adapter = select_adapter_by_luid(adapters, required, adapter_luid)?;
        let (device, queue) =
            block_on(adapter.request_device(desc)).map_err(Error::device_creation)?;
        Ok((adapter, device, queue))
    }

    fn adapter_luid(adapter: &wgpu::Adapter) -> Option<AdapterLuid> {
        let hal_adapter = unsafe { adapter.as_hal::<Dx12>() }?;
        let desc = unsafe { hal_adapter.raw_adapter().GetDesc1() }.ok()?;
        Some(AdapterLuid {
            low_part: desc.AdapterLuid.LowPart,
            high_part: desc.AdapterLuid.HighPart,
        })
    }

    pub(super) fn native_handles(device: &wgpu::Device) -> Result<NativeDeviceHandles> {
        let hal_device = unsafe { device.as_hal::<Dx12>() }
            .ok_or_else(|| Error::import("device exposes no D3D12 HAL"))?;
        Ok(NativeDeviceHandles::D3d12 {
            device: hal_device.raw_device().as_raw(),
            queue: hal_device.raw_queue().as_raw(),
        })
    }

    pub(super) unsafe fn import_texture(
        device: &wgpu::Device,
        raw: *mut c_void,
        desc: &wgpu::TextureDescriptor<'_>,
    ) -> Result<wgpu::Texture> {
        // Take our own COM reference; the runtime keeps its own.
        let resource = ID3D12Resource::from_raw_borrowed(&raw)
            .ok_or_else(|| Error::import("null ID3D12Resource"))?
            .clone();
        let hal_texture = wgpu::hal::dx12::Device::texture_from_raw(
            resource,
            desc.format,
            desc.dimension,
            desc.size,
            desc.mip_level_count,
            desc.sample_count,
        );
        Ok(device.create_texture_from_hal::<Dx12>(hal_texture, desc))
    }
}
