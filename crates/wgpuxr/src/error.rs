//! Error type shared by every bridge entry point.

use ash::vk;
use openxr::sys;
use thiserror::Error;

use crate::types::AdapterLuid;

/// Result type alias using the bridge's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the bridge.
///
/// Every variant maps onto an OpenXR result code through [`Error::xr_result`],
/// so the façade stays a drop-in replacement for the native calls.
#[derive(Debug, Error)]
pub enum Error {
    /// A structure's `ty` tag did not match the expected discriminator.
    #[error("unexpected structure type for {0}")]
    HandleInvalid(&'static str),

    /// A backend-specific step failed (format mismatch, image count drift, ...).
    #[error("runtime failure: {0}")]
    RuntimeFailure(String),

    /// A backend name that is neither `d3d12` nor `vulkan`.
    #[error("unknown backend '{0}' (expected d3d12 or vulkan)")]
    UnknownBackend(String),

    /// The device runs on a backend with no session implementation.
    #[error("unsupported backend: {0:?}")]
    UnsupportedBackend(wgpu::Backend),

    /// A native Vulkan object could not be created through the runtime.
    #[error("native object creation failed: {0}")]
    NativeCreationFailed(vk::Result),

    /// The owning session was destroyed while one of its swapchains was being
    /// created.
    #[error("session {0:?} was destroyed during swapchain creation")]
    SessionDestroyed(sys::Session),

    /// No adapter on this machine has the LUID the runtime requires.
    #[error("no adapter with LUID {0}")]
    AdapterNotFound(AdapterLuid),

    /// Building a GPU device on the runtime's adapter failed.
    #[error("device creation failed: {0}")]
    DeviceCreation(String),

    /// Wrapping a native image as a wgpu texture failed.
    #[error("texture import failed: {0}")]
    Import(String),

    /// An OpenXR call failed; the code is passed through untouched.
    #[error("OpenXR call failed: {0}")]
    Runtime(#[from] sys::Result),
}

impl Error {
    /// Create a runtime failure from any displayable type.
    pub fn runtime_failure(msg: impl std::fmt::Display) -> Self {
        Self::RuntimeFailure(msg.to_string())
    }

    /// Create a device creation error from any displayable type.
    pub fn device_creation(msg: impl std::fmt::Display) -> Self {
        Self::DeviceCreation(msg.to_string())
    }

    /// Create an import error from any displayable type.
    pub fn import(msg: impl std::fmt::Display) -> Self {
        Self::Import(msg.to_string())
    }

    /// The OpenXR result code reported to callers of the mirrored entry points.
    pub fn xr_result(&self) -> sys::Result {
        match self {
            Self::HandleInvalid(_) | Self::SessionDestroyed(_) => sys::Result::ERROR_HANDLE_INVALID,
            Self::RuntimeFailure(_)
            | Self::UnknownBackend(_)
            | Self::UnsupportedBackend(_)
            | Self::NativeCreationFailed(_)
            | Self::AdapterNotFound(_)
            | Self::DeviceCreation(_)
            | Self::Import(_) => sys::Result::ERROR_RUNTIME_FAILURE,
            Self::Runtime(code) => *code,
        }
    }
}

impl From<Error> for sys::Result {
    fn from(err: Error) -> Self {
        err.xr_result()
    }
}
