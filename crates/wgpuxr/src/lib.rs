//! Session and swapchain bridge between OpenXR and wgpu.
//!
//! [`Bridge`] exposes functions shaped like `xrCreateSession`,
//! `xrCreateSwapchain`, `xrEnumerateSwapchainImages` and friends. Sessions
//! created with a [`GraphicsBindingWgpu`] in their `next` chain are bound to
//! the device's native D3D12 or Vulkan objects, and their swapchain images are
//! handed back as wgpu texture views. Every other handle is forwarded to the
//! runtime untouched.

pub mod adapter;
pub mod backend;
pub mod bridge;
pub mod error;
pub mod gpu;
pub mod registry;
pub mod requirements;
pub mod runtime;
pub mod types;

#[cfg(test)]
mod test_support;

pub use adapter::{
    create_adapter_options, select_adapter_by_luid, AdapterOptions, VulkanAdapterHooks,
    VulkanHookContext,
};
pub use backend::BackendSession;
pub use bridge::Bridge;
pub use error::{Error, Result};
pub use gpu::{GpuDevice, NativeDeviceHandles, NativeImage, WgpuDevice};
pub use requirements::graphics_requirements;
pub use runtime::{OpenXrRuntime, XrResult, XrRuntime};
pub use types::{
    AdapterLuid, ApiVersion, Backend, GraphicsBindingWgpu, GraphicsRequirements,
    GraphicsRequirementsWgpu, SwapchainImageWgpu, BGRA8_UNORM_SRGB, GRAPHICS_BINDING_WGPU,
    GRAPHICS_REQUIREMENTS_WGPU, SWAPCHAIN_FORMAT, SWAPCHAIN_IMAGE_WGPU,
};
