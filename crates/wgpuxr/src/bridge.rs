//! Drop-in replacements for the OpenXR session and swapchain calls.
//!
//! Each entry point looks its handle up in the registry. Handles the bridge
//! created are served from the bridged objects; anything else goes straight
//! to the runtime with its arguments untouched.

use std::sync::Arc;

use openxr::sys;
use tracing::{debug, info, warn};

use crate::adapter::{create_adapter_options, AdapterOptions};
use crate::backend::BackendSession;
use crate::error::{Error, Result};
use crate::gpu::GpuDevice;
use crate::registry::{BridgedSwapchain, Registry};
use crate::requirements::graphics_requirements;
use crate::runtime::XrRuntime;
use crate::types::{
    GraphicsBindingWgpu, GraphicsRequirements, GraphicsRequirementsWgpu, SwapchainImageWgpu,
    GRAPHICS_BINDING_WGPU, GRAPHICS_REQUIREMENTS_WGPU, SWAPCHAIN_IMAGE_WGPU,
};

/// Session/swapchain bridge between an OpenXR runtime and GPU devices of type `D`.
pub struct Bridge<R, D: GpuDevice> {
    runtime: Arc<R>,
    registry: Registry<D>,
}

impl<R: XrRuntime, D: GpuDevice> Bridge<R, D> {
    pub fn new(runtime: R) -> Self {
        Self {
            runtime: Arc::new(runtime),
            registry: Registry::new(),
        }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// `xrGetD3D12GraphicsRequirementsKHR` / `xrGetVulkanGraphicsRequirements2KHR`
    /// for the given backend. `requirements` is only checked for its `ty`
    /// tag; the decoded requirements are returned.
    pub fn get_graphics_requirements(
        &self,
        instance: sys::Instance,
        system_id: sys::SystemId,
        backend: wgpu::Backend,
        requirements: &GraphicsRequirementsWgpu,
    ) -> Result<GraphicsRequirements> {
        if requirements.ty != GRAPHICS_REQUIREMENTS_WGPU {
            return Err(Error::HandleInvalid("GraphicsRequirementsWgpu"));
        }
        graphics_requirements(self.runtime.as_ref(), instance, system_id, backend)
    }

    pub fn create_adapter_options(
        &self,
        instance: sys::Instance,
        system_id: sys::SystemId,
        backend: wgpu::Backend,
    ) -> Result<AdapterOptions<R>> {
        create_adapter_options(Arc::clone(&self.runtime), instance, system_id, backend)
    }

    /// `xrCreateSession`.
    ///
    /// When `create_info.next` starts with a [`GraphicsBindingWgpu`], the
    /// graphics requirements for the device's backend are queried and a
    /// session is created with the matching native binding. Otherwise the call
    /// is forwarded unmodified.
    ///
    /// # Safety
    ///
    /// `create_info.next` is null or points to a valid OpenXR structure. If
    /// that structure is tagged [`GRAPHICS_BINDING_WGPU`] it must be a
    /// `GraphicsBindingWgpu<D>`.
    pub unsafe fn create_session(
        &self,
        instance: sys::Instance,
        create_info: &sys::SessionCreateInfo,
    ) -> Result<sys::Session> {
        let header = create_info.next.cast::<sys::BaseInStructure>();
        if header.is_null() || (*header).ty != GRAPHICS_BINDING_WGPU {
            debug!("forwarding xrCreateSession");
            return Ok(self.runtime.create_session(instance, create_info)?);
        }
        let binding = &*create_info.next.cast::<GraphicsBindingWgpu<'_, D>>();
        let device = binding.device;

        // Runtimes reject session creation until requirements were queried.
        graphics_requirements(
            self.runtime.as_ref(),
            instance,
            create_info.system_id,
            device.backend(),
        )?;
        let session = BackendSession::create(self.runtime.as_ref(), instance, create_info, device)?;
        let session = self.registry.insert_session(session);
        info!(handle = ?session.handle(), backend = %session.backend(), "bridged session");
        Ok(session.handle())
    }

    /// `xrDestroySession`.
    ///
    /// A bridged session is deregistered first, together with any swapchains
    /// it still owns, then the call is forwarded. The runtime destroys those
    /// swapchains along with the session, so no `xrDestroySwapchain` is issued
    /// for them.
    pub fn destroy_session(&self, session: sys::Session) -> Result<()> {
        if let Some((bridged, swapchains)) = self.registry.remove_session(session) {
            if !swapchains.is_empty() {
                debug!(
                    ?session,
                    count = swapchains.len(),
                    "dropping swapchains of destroyed session"
                );
            }
            drop(swapchains);
            drop(bridged);
            info!(?session, "unbridged session");
        }
        Ok(self.runtime.destroy_session(session)?)
    }

    /// `xrEnumerateSwapchainFormats`. Bridged sessions report `webgpu.h`
    /// format codes.
    ///
    /// # Safety
    ///
    /// `formats` is null or valid for `capacity` writes.
    pub unsafe fn enumerate_swapchain_formats(
        &self,
        session: sys::Session,
        capacity: u32,
        count_output: &mut u32,
        formats: *mut i64,
    ) -> Result<()> {
        let Some(bridged) = self.registry.session(session) else {
            return Ok(self
                .runtime
                .enumerate_swapchain_formats(session, capacity, count_output, formats)?);
        };
        let supported = bridged.enumerate_swapchain_formats();
        *count_output = supported.len() as u32;
        if !formats.is_null() {
            let n = capacity.min(*count_output) as usize;
            for (i, format) in supported.iter().take(n).enumerate() {
                *formats.add(i) = *format;
            }
        }
        Ok(())
    }

    /// `xrCreateSwapchain`. On a bridged session the runtime's images are
    /// imported as texture views.
    pub fn create_swapchain(
        &self,
        session: sys::Session,
        create_info: &sys::SwapchainCreateInfo,
    ) -> Result<sys::Swapchain> {
        let Some(bridged) = self.registry.session(session) else {
            return Ok(self.runtime.create_swapchain(session, create_info)?);
        };
        let (views, handle) = bridged.create_swapchain(self.runtime.as_ref(), create_info)?;
        drop(bridged);

        // The runtime destroys the swapchain together with its session, so
        // only the views are released here.
        if let Err(orphan) = self
            .registry
            .insert_swapchain(BridgedSwapchain::new(handle, session, views))
        {
            warn!(?session, swapchain = ?handle, "session destroyed during swapchain creation");
            drop(orphan);
            return Err(Error::SessionDestroyed(session));
        }
        Ok(handle)
    }

    /// `xrDestroySwapchain`. A bridged swapchain's views are dropped before the
    /// call is forwarded.
    pub fn destroy_swapchain(&self, swapchain: sys::Swapchain) -> Result<()> {
        if let Some(bridged) = self.registry.remove_swapchain(swapchain) {
            debug!(?swapchain, images = bridged.views().len(), "unbridged swapchain");
            drop(bridged);
        }
        Ok(self.runtime.destroy_swapchain(swapchain)?)
    }

    /// `xrEnumerateSwapchainImages`. For bridged swapchains `images` holds
    /// [`SwapchainImageWgpu`] entries which receive the texture views in
    /// runtime order.
    ///
    /// # Safety
    ///
    /// `images` is null or valid for `capacity` entries. For a bridged
    /// swapchain every entry is an initialized `SwapchainImageWgpu` over
    /// `D::TextureView`; otherwise they are whatever the runtime expects.
    pub unsafe fn enumerate_swapchain_images(
        &self,
        swapchain: sys::Swapchain,
        capacity: u32,
        count_output: &mut u32,
        images: *mut sys::SwapchainImageBaseHeader,
    ) -> Result<()> {
        let Some(bridged) = self.registry.swapchain(swapchain) else {
            return Ok(self
                .runtime
                .enumerate_swapchain_images(swapchain, capacity, count_output, images)?);
        };
        let views = bridged.views();
        *count_output = views.len() as u32;
        if images.is_null() {
            return Ok(());
        }
        let images = images.cast::<SwapchainImageWgpu<D::TextureView>>();
        let n = capacity.min(*count_output) as usize;
        for (i, view) in views.iter().take(n).enumerate() {
            let entry = &mut *images.add(i);
            if entry.ty != SWAPCHAIN_IMAGE_WGPU {
                return Err(Error::HandleInvalid("SwapchainImageWgpu"));
            }
            entry.texture_view = Some(view.clone());
        }
        Ok(())
    }

    pub fn is_session_bridged(&self, session: sys::Session) -> bool {
        self.registry.session(session).is_some()
    }

    pub fn is_swapchain_bridged(&self, swapchain: sys::Swapchain) -> bool {
        self.registry.swapchain(swapchain).is_some()
    }

    /// The views of a bridged swapchain, in runtime image order.
    pub fn swapchain_views(&self, swapchain: sys::Swapchain) -> Option<Vec<D::TextureView>> {
        self.registry
            .swapchain(swapchain)
            .map(|bridged| bridged.views().to_vec())
    }

    pub fn session_count(&self) -> usize {
        self.registry.session_count()
    }

    pub fn swapchain_count(&self) -> usize {
        self.registry.swapchain_count()
    }
}
