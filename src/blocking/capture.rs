//! Blocking watcher for per-capture progress callbacks.
//!
//! `CaptureProgressWatcher` is installed as the [`CaptureObserver`] for a
//! capture request (or burst). Every notification is forwarded to an
//! optional external proxy first, then recorded as a named state so a
//! client thread can block for "this capture started" or "this capture
//! completed" with a bounded wait.

use std::sync::Arc;

use crate::api::{CaptureFailure, CaptureObserver, CaptureResult};
use crate::blocking::waiter::StateWaiter;

/// Exposure started.
pub const CAPTURE_STARTED: u32 = 0;
/// A partial result arrived.
pub const CAPTURE_PROGRESSED: u32 = 1;
/// The final result arrived.
pub const CAPTURE_COMPLETED: u32 = 2;
/// The capture failed.
pub const CAPTURE_FAILED: u32 = 3;
/// A capture sequence finished.
pub const CAPTURE_SEQUENCE_COMPLETED: u32 = 4;
/// A capture sequence was aborted.
pub const CAPTURE_SEQUENCE_ABORTED: u32 = 5;

static CAPTURE_STATE_NAMES: [&str; 6] = [
    "STARTED",
    "PROGRESSED",
    "COMPLETED",
    "FAILED",
    "SEQUENCE_COMPLETED",
    "SEQUENCE_ABORTED",
];

/// Tees capture progress callbacks to a proxy while feeding a state queue.
pub struct CaptureProgressWatcher {
    proxy: Option<Arc<dyn CaptureObserver>>,
    waiter: StateWaiter,
}

impl CaptureProgressWatcher {
    /// Creates a watcher. A supplied `proxy` receives every notification,
    /// synchronously on the delivery thread, before the state is recorded.
    pub fn new(proxy: Option<Arc<dyn CaptureObserver>>) -> Self {
        Self {
            proxy,
            waiter: StateWaiter::new(&CAPTURE_STATE_NAMES),
        }
    }

    /// The state queue fed by this watcher, for `wait_for_any`-style calls
    /// against the `CAPTURE_*` constants.
    pub fn waiter(&self) -> &StateWaiter {
        &self.waiter
    }
}

impl CaptureObserver for CaptureProgressWatcher {
    fn on_capture_started(&self, request_id: u64, timestamp_ns: i64) {
        if let Some(proxy) = &self.proxy {
            proxy.on_capture_started(request_id, timestamp_ns);
        }
        self.waiter.record(CAPTURE_STARTED);
    }

    fn on_capture_progressed(&self, partial: &CaptureResult) {
        if let Some(proxy) = &self.proxy {
            proxy.on_capture_progressed(partial);
        }
        self.waiter.record(CAPTURE_PROGRESSED);
    }

    fn on_capture_completed(&self, result: &CaptureResult) {
        if let Some(proxy) = &self.proxy {
            proxy.on_capture_completed(result);
        }
        self.waiter.record(CAPTURE_COMPLETED);
    }

    fn on_capture_failed(&self, failure: &CaptureFailure) {
        if let Some(proxy) = &self.proxy {
            proxy.on_capture_failed(failure);
        }
        self.waiter.record(CAPTURE_FAILED);
    }

    fn on_capture_sequence_completed(&self, sequence_id: u64, frame_number: u64) {
        if let Some(proxy) = &self.proxy {
            proxy.on_capture_sequence_completed(sequence_id, frame_number);
        }
        self.waiter.record(CAPTURE_SEQUENCE_COMPLETED);
    }

    fn on_capture_sequence_aborted(&self, sequence_id: u64) {
        if let Some(proxy) = &self.proxy {
            proxy.on_capture_sequence_aborted(sequence_id);
        }
        self.waiter.record(CAPTURE_SEQUENCE_ABORTED);
    }
}
