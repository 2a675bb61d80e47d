//! The GPU abstraction layer side of the bridge.
//!
//! Sessions borrow the caller's device through [`GpuDevice`], read the native
//! handles an OpenXR graphics binding needs, and ask the device to wrap
//! runtime-allocated images as textures. [`WgpuDevice`] can also open that
//! device on the adapter the runtime requires.

use std::ffi::c_void;

use ash::vk;

use crate::error::Result;

mod wgpu_device;

pub use wgpu_device::WgpuDevice;

/// Native objects behind a GPU device, as an OpenXR graphics binding wants them.
#[derive(Debug, Clone, Copy)]
pub enum NativeDeviceHandles {
    D3d12 {
        /// `ID3D12Device*`
        device: *mut c_void,
        /// `ID3D12CommandQueue*`
        queue: *mut c_void,
    },
    Vulkan {
        instance: vk::Instance,
        physical_device: vk::PhysicalDevice,
        device: vk::Device,
        queue_family_index: u32,
        queue_index: u32,
    },
}

/// A runtime-owned swapchain image, as enumerated by OpenXR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeImage {
    /// `ID3D12Resource*`
    D3d12(*mut c_void),
    Vulkan(vk::Image),
}

/// A GPU device the bridge can attach OpenXR sessions to.
///
/// Clones must refer to the same underlying device; sessions keep a clone
/// alive for as long as they are registered.
pub trait GpuDevice: Clone + Send + Sync + 'static {
    type TextureView: Clone + Send + Sync + 'static;

    /// The backend this device runs on. Session dispatch keys off this.
    fn backend(&self) -> wgpu::Backend;

    /// Native handles for the OpenXR graphics binding.
    fn native_handles(&self) -> Result<NativeDeviceHandles>;

    /// Wrap a runtime-owned image as a texture and return a view over it.
    ///
    /// The image's memory stays owned by the runtime: no backing allocation is
    /// made and dropping the view never frees the native image.
    ///
    /// # Safety
    ///
    /// `image` must be a live image created on this device's native device,
    /// matching `desc`, and must outlive every use of the returned view.
    unsafe fn import_texture(
        &self,
        image: NativeImage,
        desc: &wgpu::TextureDescriptor<'_>,
    ) -> Result<Self::TextureView>;
}

/// View descriptor used for every imported swapchain image: 2-D, the
/// first mip level and array layer, all aspects.
pub fn swapchain_view_descriptor(
    format: wgpu::TextureFormat,
) -> wgpu::TextureViewDescriptor<'static> {
    wgpu::TextureViewDescriptor {
        label: Some("wgpuxr swapchain view"),
        format: Some(format),
        dimension: Some(wgpu::TextureViewDimension::D2),
        aspect: wgpu::TextureAspect::All,
        base_mip_level: 0,
        mip_level_count: Some(1),
        base_array_layer: 0,
        array_layer_count: Some(1),
        ..Default::default()
    }
}
