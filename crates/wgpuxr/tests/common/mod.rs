//! Recording OpenXR runtime and GPU device fakes shared by the integration tests.

#![allow(dead_code)]

use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex, MutexGuard};

use ash::vk::{self, Handle};
use openxr::sys;
use openxr::sys::Handle as _;
use wgpuxr::types::native::{
    D3d12GraphicsBinding, D3d12SwapchainImage, VulkanGraphicsBinding, VulkanSwapchainImage,
};
use wgpuxr::types::{AdapterLuid, ApiVersion, D3d12Requirements, VulkanRequirements};
use wgpuxr::{
    GpuDevice, GraphicsBindingWgpu, NativeDeviceHandles, NativeImage, XrResult, XrRuntime,
    BGRA8_UNORM_SRGB,
};

pub const INSTANCE: u64 = 0x1;
pub const SYSTEM_ID: u64 = 0x2;
pub const NATIVE_SESSION: u64 = 0x5e55;

pub const D3D12_DEVICE: usize = 0xd3d0;
pub const D3D12_QUEUE: usize = 0xd3d1;
pub const VK_INSTANCE: u64 = 0x7100;
pub const VK_PHYSICAL_DEVICE: u64 = 0x7200;
pub const VK_DEVICE: u64 = 0x7300;
pub const VK_QUEUE_FAMILY: u32 = 2;

pub fn instance() -> sys::Instance {
    sys::Instance::from_raw(INSTANCE)
}

pub fn system_id() -> sys::SystemId {
    sys::SystemId::from_raw(SYSTEM_ID)
}

/// Native image value the fake runtime hands out for image `index` of `swapchain`.
pub fn native_image(swapchain: sys::Swapchain, index: u32) -> u64 {
    swapchain.into_raw() * 0x100 + u64::from(index) + 1
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreateSession { next_ty: Option<sys::StructureType> },
    DestroySession(sys::Session),
    EnumerateSwapchainFormats(sys::Session),
    CreateSwapchain { session: sys::Session, format: i64 },
    DestroySwapchain(sys::Swapchain),
    EnumerateSwapchainImages { swapchain: sys::Swapchain, capacity: u32 },
    D3d12Requirements,
    VulkanRequirements,
}

#[derive(Debug, Clone, Copy)]
pub enum CapturedBinding {
    D3d12(D3d12GraphicsBinding),
    Vulkan(VulkanGraphicsBinding),
}

#[derive(Debug)]
struct State {
    calls: Vec<Call>,
    bindings: Vec<CapturedBinding>,
    next_swapchain: u64,
    image_count: u32,
    drift_image_count: bool,
    requirements_result: sys::Result,
    create_session_result: sys::Result,
    create_swapchain_result: sys::Result,
    destroy_swapchain_result: sys::Result,
}

/// OpenXR runtime stand-in that records every call it receives.
#[derive(Debug)]
pub struct FakeRuntime {
    state: Mutex<State>,
}

// The captured bindings hold raw device pointers that are only compared,
// never dereferenced.
unsafe impl Send for State {}

impl Default for FakeRuntime {
    fn default() -> Self {
        Self {
            state: Mutex::new(State {
                calls: Vec::new(),
                bindings: Vec::new(),
                next_swapchain: 0x5c00,
                image_count: 2,
                drift_image_count: false,
                requirements_result: sys::Result::SUCCESS,
                create_session_result: sys::Result::SUCCESS,
                create_swapchain_result: sys::Result::SUCCESS,
                destroy_swapchain_result: sys::Result::SUCCESS,
            }),
        }
    }
}

fn status(result: sys::Result) -> XrResult<()> {
    if result.into_raw() < 0 {
        Err(result)
    } else {
        Ok(())
    }
}

impl FakeRuntime {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    pub fn with_image_count(self, count: u32) -> Self {
        self.state().image_count = count;
        self
    }

    pub fn with_drifting_image_count(self) -> Self {
        self.state().drift_image_count = true;
        self
    }

    pub fn with_requirements_result(self, result: sys::Result) -> Self {
        self.state().requirements_result = result;
        self
    }

    pub fn with_create_session_result(self, result: sys::Result) -> Self {
        self.state().create_session_result = result;
        self
    }

    pub fn with_create_swapchain_result(self, result: sys::Result) -> Self {
        self.state().create_swapchain_result = result;
        self
    }

    pub fn with_destroy_swapchain_result(self, result: sys::Result) -> Self {
        self.state().destroy_swapchain_result = result;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state().calls.iter().filter(|call| pred(call)).count()
    }

    pub fn bindings(&self) -> Vec<CapturedBinding> {
        self.state().bindings.clone()
    }

    fn record(&self, call: Call) {
        self.state().calls.push(call);
    }
}

impl XrRuntime for FakeRuntime {
    fn create_session(
        &self,
        _instance: sys::Instance,
        create_info: &sys::SessionCreateInfo,
    ) -> XrResult<sys::Session> {
        let header = create_info.next.cast::<sys::BaseInStructure>();
        let next_ty = (!header.is_null()).then(|| unsafe { (*header).ty });
        self.record(Call::CreateSession { next_ty });
        status(self.state().create_session_result)?;

        match next_ty {
            Some(sys::StructureType::GRAPHICS_BINDING_VULKAN_KHR) => {
                let binding = unsafe { *create_info.next.cast::<VulkanGraphicsBinding>() };
                self.state().bindings.push(CapturedBinding::Vulkan(binding));
            }
            Some(sys::StructureType::GRAPHICS_BINDING_D3D12_KHR) => {
                let binding = unsafe { *create_info.next.cast::<D3d12GraphicsBinding>() };
                self.state().bindings.push(CapturedBinding::D3d12(binding));
            }
            _ => {}
        }
        Ok(sys::Session::from_raw(NATIVE_SESSION))
    }

    fn destroy_session(&self, session: sys::Session) -> XrResult<()> {
        self.record(Call::DestroySession(session));
        Ok(())
    }

    unsafe fn enumerate_swapchain_formats(
        &self,
        session: sys::Session,
        capacity: u32,
        count_output: &mut u32,
        formats: *mut i64,
    ) -> XrResult<()> {
        self.record(Call::EnumerateSwapchainFormats(session));
        let native = [50_i64, 37];
        *count_output = native.len() as u32;
        if !formats.is_null() {
            for (i, format) in native.iter().take(capacity as usize).enumerate() {
                *formats.add(i) = *format;
            }
        }
        Ok(())
    }

    fn create_swapchain(
        &self,
        session: sys::Session,
        create_info: &sys::SwapchainCreateInfo,
    ) -> XrResult<sys::Swapchain> {
        self.record(Call::CreateSwapchain {
            session,
            format: create_info.format,
        });
        let mut state = self.state();
        status(state.create_swapchain_result)?;
        state.next_swapchain += 1;
        Ok(sys::Swapchain::from_raw(state.next_swapchain))
    }

    fn destroy_swapchain(&self, swapchain: sys::Swapchain) -> XrResult<()> {
        self.record(Call::DestroySwapchain(swapchain));
        status(self.state().destroy_swapchain_result)
    }

    unsafe fn enumerate_swapchain_images(
        &self,
        swapchain: sys::Swapchain,
        capacity: u32,
        count_output: &mut u32,
        images: *mut sys::SwapchainImageBaseHeader,
    ) -> XrResult<()> {
        self.record(Call::EnumerateSwapchainImages {
            swapchain,
            capacity,
        });
        let (count, drift) = {
            let state = self.state();
            (state.image_count, state.drift_image_count)
        };
        if images.is_null() {
            *count_output = count;
            return Ok(());
        }
        if capacity < count {
            *count_output = count;
            return Err(sys::Result::ERROR_SIZE_INSUFFICIENT);
        }
        let written = if drift { count - 1 } else { count };
        *count_output = written;
        match (*images).ty {
            sys::StructureType::SWAPCHAIN_IMAGE_VULKAN_KHR => {
                let images = images.cast::<VulkanSwapchainImage>();
                for i in 0..written {
                    (*images.add(i as usize)).image = native_image(swapchain, i);
                }
            }
            sys::StructureType::SWAPCHAIN_IMAGE_D3D12_KHR => {
                let images = images.cast::<D3d12SwapchainImage>();
                for i in 0..written {
                    (*images.add(i as usize)).texture = native_image(swapchain, i) as *mut c_void;
                }
            }
            _ => return Err(sys::Result::ERROR_VALIDATION_FAILURE),
        }
        Ok(())
    }

    fn d3d12_graphics_requirements(
        &self,
        _instance: sys::Instance,
        _system_id: sys::SystemId,
    ) -> XrResult<D3d12Requirements> {
        self.record(Call::D3d12Requirements);
        status(self.state().requirements_result)?;
        Ok(D3d12Requirements {
            adapter_luid: AdapterLuid {
                low_part: 0x1234,
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
        self.record(Call::VulkanRequirements);
        status(self.state().requirements_result)?;
        Ok(VulkanRequirements {
            min_api_version: ApiVersion {
                major: 1,
                minor: 1,
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
    ) -> XrResult<Result<vk::Instance, vk::Result>> {
        Ok(Ok(vk::Instance::from_raw(VK_INSTANCE)))
    }

    fn vulkan_graphics_device(
        &self,
        _instance: sys::Instance,
        _system_id: sys::SystemId,
        _vk_instance: vk::Instance,
    ) -> XrResult<vk::PhysicalDevice> {
        Ok(vk::PhysicalDevice::from_raw(VK_PHYSICAL_DEVICE))
    }

    unsafe fn create_vulkan_device(
        &self,
        _instance: sys::Instance,
        _system_id: sys::SystemId,
        _get_instance_proc_addr: vk::PFN_vkGetInstanceProcAddr,
        _physical_device: vk::PhysicalDevice,
        _create_info: *const vk::DeviceCreateInfo<'_>,
    ) -> XrResult<Result<vk::Device, vk::Result>> {
        Ok(Ok(vk::Device::from_raw(VK_DEVICE)))
    }
}

/// Texture view stand-in that counts how many copies are alive.
#[derive(Debug)]
pub struct FakeView {
    pub image: u64,
    pub usage: wgpu::TextureUsages,
    live: Arc<AtomicUsize>,
}

impl Clone for FakeView {
    fn clone(&self) -> Self {
        self.live.fetch_add(1, Ordering::SeqCst);
        Self {
            image: self.image,
            usage: self.usage,
            live: Arc::clone(&self.live),
        }
    }
}

impl Drop for FakeView {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

impl PartialEq for FakeView {
    fn eq(&self, other: &Self) -> bool {
        self.image == other.image
    }
}

/// Holds the first import of a [`FakeDevice`] until the test lets it go.
#[derive(Debug)]
pub struct ImportGate {
    entered: Barrier,
    resume: Barrier,
}

impl ImportGate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entered: Barrier::new(2),
            resume: Barrier::new(2),
        })
    }

    /// Block until the gated import has started.
    pub fn wait_entered(&self) {
        self.entered.wait();
    }

    /// Let the gated import finish.
    pub fn release(&self) {
        self.resume.wait();
    }
}

/// GPU device stand-in; imports produce [`FakeView`]s.
#[derive(Debug, Clone)]
pub struct FakeDevice {
    backend: wgpu::Backend,
    fail_import_at: Option<usize>,
    gate: Option<Arc<ImportGate>>,
    imports: Arc<AtomicUsize>,
    live: Arc<AtomicUsize>,
}

impl FakeDevice {
    pub fn new(backend: wgpu::Backend) -> Self {
        Self {
            backend,
            fail_import_at: None,
            gate: None,
            imports: Arc::new(AtomicUsize::new(0)),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn vulkan() -> Self {
        Self::new(wgpu::Backend::Vulkan)
    }

    pub fn d3d12() -> Self {
        Self::new(wgpu::Backend::Dx12)
    }

    /// Fail the import with this zero-based index.
    pub fn failing_import_at(mut self, index: usize) -> Self {
        self.fail_import_at = Some(index);
        self
    }

    /// Park the first import on `gate`.
    pub fn gated_by(mut self, gate: &Arc<ImportGate>) -> Self {
        self.gate = Some(Arc::clone(gate));
        self
    }

    pub fn imports(&self) -> usize {
        self.imports.load(Ordering::SeqCst)
    }

    pub fn live_views(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl GpuDevice for FakeDevice {
    type TextureView = FakeView;

    fn backend(&self) -> wgpu::Backend {
        self.backend
    }

    fn native_handles(&self) -> wgpuxr::Result<NativeDeviceHandles> {
        match self.backend {
            wgpu::Backend::Dx12 => Ok(NativeDeviceHandles::D3d12 {
                device: D3D12_DEVICE as *mut c_void,
                queue: D3D12_QUEUE as *mut c_void,
            }),
            wgpu::Backend::Vulkan => Ok(NativeDeviceHandles::Vulkan {
                instance: vk::Instance::from_raw(VK_INSTANCE),
                physical_device: vk::PhysicalDevice::from_raw(VK_PHYSICAL_DEVICE),
                device: vk::Device::from_raw(VK_DEVICE),
                queue_family_index: VK_QUEUE_FAMILY,
                queue_index: 0,
            }),
            other => Err(wgpuxr::Error::UnsupportedBackend(other)),
        }
    }

    unsafe fn import_texture(
        &self,
        image: NativeImage,
        desc: &wgpu::TextureDescriptor<'_>,
    ) -> wgpuxr::Result<FakeView> {
        let index = self.imports.fetch_add(1, Ordering::SeqCst);
        if let (0, Some(gate)) = (index, &self.gate) {
            gate.entered.wait();
            gate.resume.wait();
        }
        if self.fail_import_at == Some(index) {
            return Err(wgpuxr::Error::import("injected import failure"));
        }
        assert_eq!(desc.format, wgpu::TextureFormat::Bgra8UnormSrgb);
        assert_eq!(desc.dimension, wgpu::TextureDimension::D2);
        let image = match image {
            NativeImage::Vulkan(image) => image.as_raw(),
            NativeImage::D3d12(texture) => texture as u64,
        };
        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(FakeView {
            image,
            usage: desc.usage,
            live: Arc::clone(&self.live),
        })
    }
}

pub fn session_create_info(next: *const c_void) -> sys::SessionCreateInfo {
    sys::SessionCreateInfo {
        ty: sys::StructureType::SESSION_CREATE_INFO,
        next,
        create_flags: sys::SessionCreateFlags::EMPTY,
        system_id: system_id(),
    }
}

pub fn swapchain_create_info(width: u32, height: u32) -> sys::SwapchainCreateInfo {
    sys::SwapchainCreateInfo {
        ty: sys::StructureType::SWAPCHAIN_CREATE_INFO,
        next: ptr::null(),
        create_flags: sys::SwapchainCreateFlags::EMPTY,
        usage_flags: sys::SwapchainUsageFlags::COLOR_ATTACHMENT,
        format: BGRA8_UNORM_SRGB,
        sample_count: 1,
        width,
        height,
        face_count: 1,
        array_size: 1,
        mip_count: 1,
    }
}

/// Create a bridged session for `device` through `bridge`.
pub fn bridged_session(
    bridge: &wgpuxr::Bridge<FakeRuntime, FakeDevice>,
    device: &FakeDevice,
) -> wgpuxr::Result<sys::Session> {
    let binding = GraphicsBindingWgpu::new(device);
    let create_info = session_create_info(ptr::addr_of!(binding).cast());
    unsafe { bridge.create_session(instance(), &create_info) }
}
