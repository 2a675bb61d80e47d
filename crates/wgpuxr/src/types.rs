//! Boundary structures and plain data shared across the bridge.
//!
//! The `#[repr(C)]` structs here follow OpenXR's graphics-binding layout: a
//! leading `ty`/`next` header identical to `XrBaseInStructure` /
//! `XrBaseOutStructure`, then one payload field. That keeps them walkable by
//! anything that traverses an OpenXR `next` chain.

use std::ffi::c_void;
use std::fmt;
use std::ptr;
use std::str::FromStr;

use openxr::sys;
use serde::{Deserialize, Serialize};

use crate::error::Error;

// There are no registered structure types for wgpu, so the D3D11 ones are
// borrowed. A session using the wgpu binding can never be a D3D11 session.
pub const GRAPHICS_BINDING_WGPU: sys::StructureType =
    sys::StructureType::GRAPHICS_BINDING_D3D11_KHR;
pub const SWAPCHAIN_IMAGE_WGPU: sys::StructureType = sys::StructureType::SWAPCHAIN_IMAGE_D3D11_KHR;
pub const GRAPHICS_REQUIREMENTS_WGPU: sys::StructureType =
    sys::StructureType::GRAPHICS_REQUIREMENTS_D3D11_KHR;

/// `webgpu.h` numeric code of `BGRA8UnormSrgb`, the only bridged format.
pub const BGRA8_UNORM_SRGB: i64 = 0x18;

/// The wgpu format every bridged swapchain uses.
pub const SWAPCHAIN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8UnormSrgb;

/// Mirrors `XrGraphicsBindingD3D12KHR` and friends, carrying a GPU device.
///
/// Chain it into `XrSessionCreateInfo::next` and pass the create info to
/// [`Bridge::create_session`](crate::Bridge::create_session).
#[repr(C)]
pub struct GraphicsBindingWgpu<'a, D> {
    pub ty: sys::StructureType,
    pub next: *const c_void,
    pub device: &'a D,
}

impl<'a, D> GraphicsBindingWgpu<'a, D> {
    pub fn new(device: &'a D) -> Self {
        Self {
            ty: GRAPHICS_BINDING_WGPU,
            next: ptr::null(),
            device,
        }
    }
}

/// Mirrors `XrSwapchainImageD3D12KHR` and friends, carrying a texture view.
#[repr(C)]
pub struct SwapchainImageWgpu<V> {
    pub ty: sys::StructureType,
    pub next: *mut c_void,
    pub texture_view: Option<V>,
}

impl<V> SwapchainImageWgpu<V> {
    pub fn new() -> Self {
        Self {
            ty: SWAPCHAIN_IMAGE_WGPU,
            next: ptr::null_mut(),
            texture_view: None,
        }
    }
}

impl<V> Default for SwapchainImageWgpu<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Mirrors `XrGraphicsRequirementsD3D12KHR` and friends. Carries no payload;
/// the decoded requirements are returned as [`GraphicsRequirements`].
#[repr(C)]
#[derive(Debug)]
pub struct GraphicsRequirementsWgpu {
    pub ty: sys::StructureType,
    pub next: *mut c_void,
}

impl GraphicsRequirementsWgpu {
    pub fn new() -> Self {
        Self {
            ty: GRAPHICS_REQUIREMENTS_WGPU,
            next: ptr::null_mut(),
        }
    }
}

impl Default for GraphicsRequirementsWgpu {
    fn default() -> Self {
        Self::new()
    }
}

/// Native graphics APIs whose swapchain images can be bridged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    D3d12,
    Vulkan,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::D3d12, Backend::Vulkan];

    /// Classify a wgpu backend; `None` for backends without a session implementation.
    pub fn from_wgpu(backend: wgpu::Backend) -> Option<Self> {
        match backend {
            wgpu::Backend::Dx12 => Some(Self::D3d12),
            wgpu::Backend::Vulkan => Some(Self::Vulkan),
            _ => None,
        }
    }

    pub fn to_wgpu(self) -> wgpu::Backend {
        match self {
            Self::D3d12 => wgpu::Backend::Dx12,
            Self::Vulkan => wgpu::Backend::Vulkan,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::D3d12 => "d3d12",
            Self::Vulkan => "vulkan",
        }
    }

    /// Native enumerator the runtime sees for [`SWAPCHAIN_FORMAT`].
    pub fn native_swapchain_format(self) -> i64 {
        match self {
            Self::D3d12 => native::DXGI_FORMAT_B8G8R8A8_UNORM_SRGB,
            Self::Vulkan => native::VK_FORMAT_B8G8R8A8_SRGB,
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "d3d12" | "dx12" => Ok(Self::D3d12),
            "vulkan" | "vk" => Ok(Self::Vulkan),
            other => Err(Error::UnknownBackend(other.to_string())),
        }
    }
}

/// Windows adapter LUID, as reported by `xrGetD3D12GraphicsRequirementsKHR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AdapterLuid {
    pub low_part: u32,
    pub high_part: i32,
}

impl AdapterLuid {
    /// The LUID packed the way `LUID` is laid out in memory.
    pub fn as_u64(self) -> u64 {
        ((self.high_part as u32 as u64) << 32) | self.low_part as u64
    }
}

impl fmt::Display for AdapterLuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}:{:08x}", self.high_part as u32, self.low_part)
    }
}

/// OpenXR-packed API version split into its components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApiVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u32,
}

impl From<openxr::Version> for ApiVersion {
    fn from(version: openxr::Version) -> Self {
        Self {
            major: version.major(),
            minor: version.minor(),
            patch: version.patch(),
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct D3d12Requirements {
    pub adapter_luid: AdapterLuid,
    pub min_feature_level: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulkanRequirements {
    pub min_api_version: ApiVersion,
    pub max_api_version: ApiVersion,
}

/// Backend-specific minimums the runtime demands before a session may exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum GraphicsRequirements {
    D3d12(D3d12Requirements),
    Vulkan(VulkanRequirements),
}

impl GraphicsRequirements {
    pub fn backend(&self) -> Backend {
        match self {
            Self::D3d12(_) => Backend::D3d12,
            Self::Vulkan(_) => Backend::Vulkan,
        }
    }

    /// The adapter the runtime insists on, when the backend identifies it by LUID.
    pub fn adapter_luid(&self) -> Option<AdapterLuid> {
        match self {
            Self::D3d12(reqs) => Some(reqs.adapter_luid),
            Self::Vulkan(_) => None,
        }
    }
}

/// `webgpu.h` code for a wgpu format, for the formats the bridge knows about.
pub fn format_code(format: wgpu::TextureFormat) -> Option<i64> {
    match format {
        wgpu::TextureFormat::Rgba8Unorm => Some(0x12),
        wgpu::TextureFormat::Rgba8UnormSrgb => Some(0x13),
        wgpu::TextureFormat::Bgra8Unorm => Some(0x17),
        wgpu::TextureFormat::Bgra8UnormSrgb => Some(BGRA8_UNORM_SRGB),
        _ => None,
    }
}

/// Inverse of [`format_code`].
pub fn format_from_code(code: i64) -> Option<wgpu::TextureFormat> {
    match code {
        0x12 => Some(wgpu::TextureFormat::Rgba8Unorm),
        0x13 => Some(wgpu::TextureFormat::Rgba8UnormSrgb),
        0x17 => Some(wgpu::TextureFormat::Bgra8Unorm),
        BGRA8_UNORM_SRGB => Some(wgpu::TextureFormat::Bgra8UnormSrgb),
        _ => None,
    }
}

/// Layout mirrors of the native OpenXR graphics structures the bridge fills
/// in or reads back. Field order and types follow `openxr_platform.h`.
pub mod native {
    use std::ffi::c_void;
    use std::ptr;

    use openxr::sys;

    /// `DXGI_FORMAT_B8G8R8A8_UNORM_SRGB`
    pub const DXGI_FORMAT_B8G8R8A8_UNORM_SRGB: i64 = 91;
    /// `VK_FORMAT_B8G8R8A8_SRGB`
    pub const VK_FORMAT_B8G8R8A8_SRGB: i64 = 50;

    /// `XrGraphicsBindingD3D12KHR`
    #[repr(C)]
    #[derive(Debug, Clone, Copy)]
    pub struct D3d12GraphicsBinding {
        pub ty: sys::StructureType,
        pub next: *const c_void,
        pub device: *mut c_void,
        pub queue: *mut c_void,
    }

    /// `XrGraphicsBindingVulkanKHR` (aliased by `XrGraphicsBindingVulkan2KHR`)
    #[repr(C)]
    #[derive(Debug, Clone, Copy)]
    pub struct VulkanGraphicsBinding {
        pub ty: sys::StructureType,
        pub next: *const c_void,
        pub instance: *const c_void,
        pub physical_device: *const c_void,
        pub device: *const c_void,
        pub queue_family_index: u32,
        pub queue_index: u32,
    }

    /// `XrSwapchainImageD3D12KHR`
    #[repr(C)]
    #[derive(Debug, Clone, Copy)]
    pub struct D3d12SwapchainImage {
        pub ty: sys::StructureType,
        pub next: *mut c_void,
        pub texture: *mut c_void,
    }

    impl Default for D3d12SwapchainImage {
        fn default() -> Self {
            Self {
                ty: sys::StructureType::SWAPCHAIN_IMAGE_D3D12_KHR,
                next: ptr::null_mut(),
                texture: ptr::null_mut(),
            }
        }
    }

    /// `XrSwapchainImageVulkanKHR` (aliased by `XrSwapchainImageVulkan2KHR`)
    #[repr(C)]
    #[derive(Debug, Clone, Copy)]
    pub struct VulkanSwapchainImage {
        pub ty: sys::StructureType,
        pub next: *mut c_void,
        pub image: u64,
    }

    impl Default for VulkanSwapchainImage {
        fn default() -> Self {
            Self {
                ty: sys::StructureType::SWAPCHAIN_IMAGE_VULKAN_KHR,
                next: ptr::null_mut(),
                image: 0,
            }
        }
    }
}
