//! Handle registry for bridged sessions and swapchains.
//!
//! A handle is present exactly while its bridged object is alive. Locks are
//! held only for a lookup, insert or removal, never across a runtime or GPU
//! call.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use openxr::sys;

use crate::backend::BackendSession;
use crate::gpu::GpuDevice;

/// A bridged swapchain: the runtime handle, its owning session, and one view
/// per runtime image in enumeration order.
#[derive(Debug)]
pub struct BridgedSwapchain<V> {
    handle: sys::Swapchain,
    session: sys::Session,
    views: Vec<V>,
}

impl<V> BridgedSwapchain<V> {
    pub fn new(handle: sys::Swapchain, session: sys::Session, views: Vec<V>) -> Self {
        Self {
            handle,
            session,
            views,
        }
    }

    pub fn handle(&self) -> sys::Swapchain {
        self.handle
    }

    pub fn session(&self) -> sys::Session {
        self.session
    }

    pub fn views(&self) -> &[V] {
        &self.views
    }
}

type SessionMap<D> = HashMap<sys::Session, Arc<BackendSession<D>>>;
type SwapchainMap<V> = HashMap<sys::Swapchain, Arc<BridgedSwapchain<V>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

pub struct Registry<D: GpuDevice> {
    sessions: Mutex<SessionMap<D>>,
    swapchains: Mutex<SwapchainMap<D::TextureView>>,
}

impl<D: GpuDevice> Default for Registry<D> {
    fn default() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            swapchains: Mutex::new(HashMap::new()),
        }
    }
}

impl<D: GpuDevice> Registry<D> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_session(&self, session: BackendSession<D>) -> Arc<BackendSession<D>> {
        let session = Arc::new(session);
        lock(&self.sessions).insert(session.handle(), Arc::clone(&session));
        session
    }

    pub fn session(&self, handle: sys::Session) -> Option<Arc<BackendSession<D>>> {
        lock(&self.sessions).get(&handle).cloned()
    }

    /// Remove a session together with every swapchain it owns.
    ///
    /// Returns `None` if the session was not registered; in that case no
    /// swapchain is touched.
    pub fn remove_session(
        &self,
        handle: sys::Session,
    ) -> Option<(Arc<BackendSession<D>>, Vec<Arc<BridgedSwapchain<D::TextureView>>>)> {
        let mut sessions = lock(&self.sessions);
        let session = sessions.remove(&handle)?;
        let mut swapchains = lock(&self.swapchains);
        let owned: Vec<sys::Swapchain> = swapchains
            .values()
            .filter(|swapchain| swapchain.session == handle)
            .map(|swapchain| swapchain.handle)
            .collect();
        let removed = owned
            .iter()
            .filter_map(|swapchain| swapchains.remove(swapchain))
            .collect();
        Some((session, removed))
    }

    /// Register a swapchain under its owning session.
    ///
    /// Fails, handing the swapchain back, if the owner is no longer
    /// registered. The sessions lock is held across the insert so a
    /// concurrent [`Registry::remove_session`] either sees the new swapchain
    /// or has already removed the owner.
    pub fn insert_swapchain(
        &self,
        swapchain: BridgedSwapchain<D::TextureView>,
    ) -> std::result::Result<Arc<BridgedSwapchain<D::TextureView>>, BridgedSwapchain<D::TextureView>>
    {
        let sessions = lock(&self.sessions);
        if !sessions.contains_key(&swapchain.session) {
            return Err(swapchain);
        }
        let swapchain = Arc::new(swapchain);
        lock(&self.swapchains).insert(swapchain.handle, Arc::clone(&swapchain));
        Ok(swapchain)
    }

    pub fn swapchain(
        &self,
        handle: sys::Swapchain,
    ) -> Option<Arc<BridgedSwapchain<D::TextureView>>> {
        lock(&self.swapchains).get(&handle).cloned()
    }

    pub fn remove_swapchain(
        &self,
        handle: sys::Swapchain,
    ) -> Option<Arc<BridgedSwapchain<D::TextureView>>> {
        lock(&self.swapchains).remove(&handle)
    }

    pub fn session_count(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn swapchain_count(&self) -> usize {
        lock(&self.swapchains).len()
    }
}
