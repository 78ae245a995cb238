//! Custom error types for the bridging layer.
//!
//! This module defines the primary error type, `CamError`, for the entire
//! crate. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the recoverable failures a caller can see:
//! wait timeouts, waiter misuse, and device-open outcomes.
//!
//! ## Error taxonomy
//!
//! Only *recoverable* and *business-level* conditions are represented here:
//!
//! - **`WaitTimeout` / `SessionTimeout` / `OpenTimeout`**: a blocking call
//!   ran out of its wall-clock budget. `WaitTimeout` names the states that
//!   were awaited so logs are actionable. `OpenTimeout` is special: the
//!   device-open bound is a fixed service-pathology limit, so hitting it
//!   means the camera service is wedged, not that the caller picked a
//!   timeout that was too short.
//! - **`AlreadyWaiting`**: a second thread tried to block on a waiter that
//!   already has a blocked waiter. Returned immediately, never queued.
//! - **`DeviceDisconnected` / `DeviceError`**: terminal open outcomes
//!   reported by the camera service. The caller decides retry policy.
//! - **`CallbackContext`**: the camera service would deliver notifications
//!   on the calling thread, which would self-deadlock a blocking open.
//! - **`Service`**: a failure reported by a [`CameraService`] implementation
//!   while issuing the open request itself.
//!
//! Programmer errors (recording an out-of-range state, triggering autofocus
//! before a mode was established, duplicate terminal open notifications)
//! are *not* represented here. Those panic at the violation site and are
//! never caught internally.
//!
//! [`CameraService`]: crate::api::CameraService

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type CamResult<T> = std::result::Result<T, CamError>;

/// Errors surfaced to callers of the blocking bridge.
#[derive(Error, Debug)]
pub enum CamError {
    /// A state wait exhausted its budget without a matching transition.
    #[error("timed out after {timeout_ms} ms waiting for state(s) [{states}]")]
    WaitTimeout {
        /// Budget that was exhausted, in milliseconds.
        timeout_ms: u64,
        /// Names of the awaited states.
        states: String,
    },

    /// Another thread is already blocked inside a wait on this waiter.
    #[error("another thread is already waiting on this state waiter")]
    AlreadyWaiting,

    /// No session notification of any kind arrived in time.
    #[error("timed out after {timeout_ms} ms waiting for a capture session")]
    SessionTimeout {
        /// Budget that was exhausted, in milliseconds.
        timeout_ms: u64,
    },

    /// The camera service never resolved an open attempt within the fixed
    /// internal bound. This should not happen under a healthy service and
    /// usually indicates a deadlock or a service bug.
    #[error("opening camera '{device_id}' timed out; camera service appears wedged")]
    OpenTimeout {
        /// Identifier of the device being opened.
        device_id: String,
    },

    /// The device disconnected before the open attempt could succeed.
    #[error("camera '{device_id}' disconnected while opening")]
    DeviceDisconnected {
        /// Identifier of the device being opened.
        device_id: String,
    },

    /// The device reported a hardware/service error during the open attempt.
    #[error("camera '{device_id}' reported error code {code} while opening")]
    DeviceError {
        /// Identifier of the device being opened.
        device_id: String,
        /// Positive, service-defined error code.
        code: i32,
    },

    /// Opening would deliver notifications on the calling thread.
    #[error("camera '{device_id}' callbacks would run on the calling thread; use a separate callback thread")]
    CallbackContext {
        /// Identifier of the device being opened.
        device_id: String,
    },

    /// The camera service failed to issue the open request.
    #[error("camera service error: {0}")]
    Service(String),
}

impl CamError {
    /// True for any of the timeout variants.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            CamError::WaitTimeout { .. }
                | CamError::SessionTimeout { .. }
                | CamError::OpenTimeout { .. }
        )
    }

    /// True if an open attempt failed because the device disconnected.
    pub fn was_disconnected(&self) -> bool {
        matches!(self, CamError::DeviceDisconnected { .. })
    }

    /// The positive error code of a failed open attempt, if there was one.
    pub fn error_code(&self) -> Option<i32> {
        match self {
            CamError::DeviceError { code, .. } => Some(*code),
            _ => None,
        }
    }
}
