//! Abstract contract with the camera device/session service.
//!
//! The bridging layer never talks to real hardware. Everything it needs from
//! the outside world is expressed as capability traits in this module:
//!
//! - [`CameraService`]: issues open requests and delivers notifications on
//!   its own callback thread.
//! - [`CameraDevice`] / [`CaptureSession`]: opaque handles delivered through
//!   notifications.
//! - [`DeviceObserver`] / [`SessionObserver`] / [`CaptureObserver`]: one
//!   method per event kind. The blocking watchers implement these once and
//!   optionally chain to a caller-supplied implementation of the same trait
//!   (explicit composition instead of callback subclassing).
//!
//! Value types ([`CaptureResult`], [`CaptureFailure`], [`RequestBuilder`])
//! carry only the metadata the bridge consumes. Autofocus state, mode and
//! trigger values travel as raw `i32` constants in [`af`] so that values
//! this crate does not know about can still flow through unharmed.
//!
//! # Thread safety
//!
//! All traits require `Send + Sync`: notifications arrive on an arbitrary
//! service-controlled thread while waits run on arbitrary caller threads.

use std::sync::Arc;
use std::thread::ThreadId;

use crate::error::CamResult;

// =============================================================================
// Autofocus constants
// =============================================================================

/// Raw autofocus state, mode and trigger values.
///
/// Numeric values match the platform metadata the results stream reports.
/// Unknown values are legal in a results stream and are ignored by the
/// focus machine rather than rejected.
pub mod af {
    /// AF is off or between scans.
    pub const STATE_INACTIVE: i32 = 0;
    /// Passive (continuous) scan in progress.
    pub const STATE_PASSIVE_SCAN: i32 = 1;
    /// Passive scan converged; lens may still move.
    pub const STATE_PASSIVE_FOCUSED: i32 = 2;
    /// Active (triggered) scan in progress.
    pub const STATE_ACTIVE_SCAN: i32 = 3;
    /// Active scan converged and the lens is locked.
    pub const STATE_FOCUSED_LOCKED: i32 = 4;
    /// Active scan failed to converge and the lens is locked.
    pub const STATE_NOT_FOCUSED_LOCKED: i32 = 5;
    /// Passive scan failed to converge; lens may still move.
    pub const STATE_PASSIVE_UNFOCUSED: i32 = 6;

    /// Autofocus disabled.
    pub const MODE_OFF: i32 = 0;
    /// Single-shot active autofocus.
    pub const MODE_AUTO: i32 = 1;
    /// Close-range active autofocus.
    pub const MODE_MACRO: i32 = 2;
    /// Continuous autofocus tuned for video.
    pub const MODE_CONTINUOUS_VIDEO: i32 = 3;
    /// Continuous autofocus tuned for still capture.
    pub const MODE_CONTINUOUS_PICTURE: i32 = 4;
    /// Extended depth of field; no lens movement.
    pub const MODE_EDOF: i32 = 5;

    /// No trigger change requested.
    pub const TRIGGER_IDLE: i32 = 0;
    /// Start an active scan / lock.
    pub const TRIGGER_START: i32 = 1;
    /// Cancel any in-flight scan and unlock.
    pub const TRIGGER_CANCEL: i32 = 2;
}

// =============================================================================
// Value types
// =============================================================================

/// Metadata for one completed (or partially completed) capture.
///
/// Fields the bridge does not consume are out of scope; the autofocus pair
/// is optional because upstream data loss occasionally drops either key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptureResult {
    /// Identifier of the capture request this result answers.
    pub request_id: u64,
    /// Monotonic frame counter assigned by the service.
    pub frame_number: u64,
    /// Raw autofocus state (`af::STATE_*`), if reported.
    pub af_state: Option<i32>,
    /// Raw autofocus mode (`af::MODE_*`), if reported.
    pub af_mode: Option<i32>,
}

/// Metadata for a capture that the service failed to complete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureFailure {
    /// Identifier of the failed capture request.
    pub request_id: u64,
    /// Frame at which the failure was reported.
    pub frame_number: u64,
    /// Service-defined failure reason code.
    pub reason: i32,
}

/// Mutable capture request settings, as far as the bridge manipulates them.
///
/// The focus machine writes the AF mode and trigger here; submitting the
/// request to the service is the caller's job.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestBuilder {
    af_mode: Option<i32>,
    af_trigger: Option<i32>,
}

impl RequestBuilder {
    /// Creates a builder with no AF settings applied.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the autofocus mode (`af::MODE_*`).
    pub fn set_af_mode(&mut self, mode: i32) {
        self.af_mode = Some(mode);
    }

    /// Sets the autofocus trigger (`af::TRIGGER_*`).
    pub fn set_af_trigger(&mut self, trigger: i32) {
        self.af_trigger = Some(trigger);
    }

    /// The autofocus mode currently applied, if any.
    pub fn af_mode(&self) -> Option<i32> {
        self.af_mode
    }

    /// The autofocus trigger currently applied, if any.
    pub fn af_trigger(&self) -> Option<i32> {
        self.af_trigger
    }
}

// =============================================================================
// Device / session handles
// =============================================================================

/// An open camera device handle delivered by the service.
pub trait CameraDevice: Send + Sync + std::fmt::Debug {
    /// Stable identifier of the underlying device.
    fn id(&self) -> &str;

    /// Releases the device. Must be idempotent; the open sequencer may close
    /// a device that arrives after its open attempt already timed out.
    fn close(&self);
}

/// A configured capture session handle delivered by the service.
pub trait CaptureSession: Send + Sync + std::fmt::Debug {
    /// Identifier of the device this session belongs to.
    fn device_id(&self) -> &str;

    /// Releases the session. Must be idempotent.
    fn close(&self);
}

// =============================================================================
// Observer traits (one method per event kind)
// =============================================================================

/// Receiver for device lifecycle notifications.
///
/// All methods default to no-ops so a proxy only implements the events it
/// cares about. The blocking watchers override every method.
pub trait DeviceObserver: Send + Sync {
    /// The device finished opening and is ready for use.
    fn on_opened(&self, _device: &Arc<dyn CameraDevice>) {}

    /// The device is no longer available.
    fn on_disconnected(&self, _device: &Arc<dyn CameraDevice>) {}

    /// The device or service hit a fatal error. `error` is a positive,
    /// service-defined code.
    fn on_error(&self, _device: &Arc<dyn CameraDevice>, _error: i32) {}

    /// The device finished closing.
    fn on_closed(&self, _device: &Arc<dyn CameraDevice>) {}
}

/// Receiver for capture session lifecycle notifications.
pub trait SessionObserver: Send + Sync {
    /// The session finished configuring and can accept requests.
    fn on_configured(&self, _session: &Arc<dyn CaptureSession>) {}

    /// The session could not be configured.
    fn on_configure_failed(&self, _session: &Arc<dyn CaptureSession>) {}

    /// The session has no in-flight requests.
    fn on_ready(&self, _session: &Arc<dyn CaptureSession>) {}

    /// The session started processing requests.
    fn on_active(&self, _session: &Arc<dyn CaptureSession>) {}

    /// The session was closed.
    fn on_closed(&self, _session: &Arc<dyn CaptureSession>) {}
}

/// Receiver for per-capture progress notifications.
pub trait CaptureObserver: Send + Sync {
    /// Exposure for `request_id` began.
    fn on_capture_started(&self, _request_id: u64, _timestamp_ns: i64) {}

    /// A partial result for the capture arrived.
    fn on_capture_progressed(&self, _partial: &CaptureResult) {}

    /// The final result for the capture arrived.
    fn on_capture_completed(&self, _result: &CaptureResult) {}

    /// The capture failed.
    fn on_capture_failed(&self, _failure: &CaptureFailure) {}

    /// A burst/sequence finished with `frame_number` as its last frame.
    fn on_capture_sequence_completed(&self, _sequence_id: u64, _frame_number: u64) {}

    /// A burst/sequence was aborted before completing.
    fn on_capture_sequence_aborted(&self, _sequence_id: u64) {}
}

// =============================================================================
// Camera service
// =============================================================================

/// The asynchronous camera service the bridge wraps.
///
/// Implementations must deliver all notifications for one open attempt on a
/// single logical stream, in occurrence order, with at most one terminal
/// open outcome (opened, disconnected or errored) per attempt.
pub trait CameraService: Send + Sync {
    /// Issues an asynchronous open request for `device_id`. The outcome is
    /// reported through `observer` on the service's callback thread.
    fn open_device(&self, device_id: &str, observer: Arc<dyn DeviceObserver>) -> CamResult<()>;

    /// The thread notifications are delivered on, if the service knows it
    /// up front. Used to reject blocking opens that would self-deadlock.
    fn callback_thread(&self) -> Option<ThreadId> {
        None
    }
}
