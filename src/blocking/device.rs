//! Blocking device-open sequencer.
//!
//! [`open_device`] turns the asynchronous open protocol (issue a request,
//! get exactly one terminal notification on the service's callback thread:
//! opened, disconnected or errored) into a single bounded call that either
//! returns an open device or a structured error.
//!
//! Unlike the lifecycle watchers this does not use a [`StateWaiter`]: an
//! open attempt resolves exactly once before the device could possibly be
//! closed, so a single-shot condition is sufficient and a replayable FIFO
//! would be wrong. The same deadline discipline applies.
//!
//! The timeout here is a fixed internal constant, not a caller knob. A
//! healthy camera service always resolves an open attempt; running into
//! [`OPEN_TIMEOUT`] means the service is deadlocked or buggy, which is why
//! the resulting [`CamError::OpenTimeout`] is documented as a pathology
//! rather than an ordinary outcome.
//!
//! [`StateWaiter`]: crate::blocking::waiter::StateWaiter

use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use log::warn;

use crate::api::{CameraDevice, CameraService, DeviceObserver};
use crate::error::{CamError, CamResult};

/// Hard bound on how long an open attempt may stay unresolved.
pub const OPEN_TIMEOUT: Duration = Duration::from_secs(2);

enum Outcome {
    Opened(Arc<dyn CameraDevice>),
    Disconnected,
    Errored(i32),
}

struct OpenState {
    outcome: Option<Outcome>,
    /// Any terminal notification seen, including ones that arrived after
    /// the caller already gave up.
    terminal_seen: bool,
    /// Set once the caller has returned with `OpenTimeout`; a device that
    /// arrives afterwards is closed on the spot instead of leaked.
    timed_out: bool,
}

struct OpenListener {
    proxy: Option<Arc<dyn DeviceObserver>>,
    state: Mutex<OpenState>,
    cond: Condvar,
}

impl OpenListener {
    fn new(proxy: Option<Arc<dyn DeviceObserver>>) -> Self {
        Self {
            proxy,
            state: Mutex::new(OpenState {
                outcome: None,
                terminal_seen: false,
                timed_out: false,
            }),
            cond: Condvar::new(),
        }
    }

    fn resolve(&self, outcome: Outcome) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        assert!(
            !state.terminal_seen,
            "camera service delivered a second terminal open notification"
        );
        state.terminal_seen = true;

        if state.timed_out {
            // The caller already failed with OpenTimeout; release anything
            // the late notification delivered.
            if let Outcome::Opened(device) = &outcome {
                warn!(
                    "camera '{}' opened after the open attempt timed out; closing it",
                    device.id()
                );
                device.close();
            }
            return;
        }

        state.outcome = Some(outcome);
        self.cond.notify_all();
    }

    fn wait_for_outcome(
        &self,
        device_id: &str,
        timeout: Duration,
    ) -> CamResult<Arc<dyn CameraDevice>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        loop {
            if let Some(outcome) = state.outcome.take() {
                return match outcome {
                    Outcome::Opened(device) => Ok(device),
                    Outcome::Disconnected => Err(CamError::DeviceDisconnected {
                        device_id: device_id.to_string(),
                    }),
                    Outcome::Errored(code) => Err(CamError::DeviceError {
                        device_id: device_id.to_string(),
                        code,
                    }),
                };
            }

            let now = Instant::now();
            if now >= deadline {
                state.timed_out = true;
                return Err(CamError::OpenTimeout {
                    device_id: device_id.to_string(),
                });
            }

            let (guard, _timed_out) = self
                .cond
                .wait_timeout(state, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            state = guard;
        }
    }
}

impl DeviceObserver for OpenListener {
    fn on_opened(&self, device: &Arc<dyn CameraDevice>) {
        if let Some(proxy) = &self.proxy {
            proxy.on_opened(device);
        }
        self.resolve(Outcome::Opened(Arc::clone(device)));
    }

    fn on_disconnected(&self, device: &Arc<dyn CameraDevice>) {
        if let Some(proxy) = &self.proxy {
            proxy.on_disconnected(device);
        }
        // The caller never owns a device from a failed open; release the
        // reference delivered with the terminal notification here.
        device.close();
        self.resolve(Outcome::Disconnected);
    }

    fn on_error(&self, device: &Arc<dyn CameraDevice>, error: i32) {
        if let Some(proxy) = &self.proxy {
            proxy.on_error(device, error);
        }
        assert!(error > 0, "camera service reported non-positive error code {error}");
        device.close();
        self.resolve(Outcome::Errored(error));
    }

    fn on_closed(&self, device: &Arc<dyn CameraDevice>) {
        // Not a terminal open outcome; forward only.
        if let Some(proxy) = &self.proxy {
            proxy.on_closed(device);
        }
    }
}

/// Opens `device_id` through `service` and blocks until the attempt
/// resolves or [`OPEN_TIMEOUT`] elapses.
///
/// A supplied `proxy` receives every device notification, synchronously on
/// the service's callback thread, before the sequencer acts on it. A
/// caller that wants to keep observing the device after the open simply
/// passes its long-lived observer here.
///
/// # Errors
///
/// - [`CamError::CallbackContext`] if the service would deliver
///   notifications on the calling thread (the wait could never be satisfied).
/// - [`CamError::DeviceDisconnected`] / [`CamError::DeviceError`] for
///   terminal failures; the device reference delivered alongside the
///   notification is closed by the sequencer first.
/// - [`CamError::OpenTimeout`] if nothing resolves in time. If the device
///   does arrive later it is closed immediately rather than leaked.
///
/// # Panics
///
/// Panics if the service violates its contract with a second terminal
/// notification for the same attempt, or a non-positive error code.
pub fn open_device(
    service: &dyn CameraService,
    device_id: &str,
    proxy: Option<Arc<dyn DeviceObserver>>,
) -> CamResult<Arc<dyn CameraDevice>> {
    open_device_bounded(service, device_id, proxy, OPEN_TIMEOUT)
}

fn open_device_bounded(
    service: &dyn CameraService,
    device_id: &str,
    proxy: Option<Arc<dyn DeviceObserver>>,
    timeout: Duration,
) -> CamResult<Arc<dyn CameraDevice>> {
    if service.callback_thread() == Some(thread::current().id()) {
        return Err(CamError::CallbackContext {
            device_id: device_id.to_string(),
        });
    }

    let listener = Arc::new(OpenListener::new(proxy));
    service.open_device(device_id, Arc::clone(&listener) as Arc<dyn DeviceObserver>)?;
    listener.wait_for_outcome(device_id, timeout)
}
