//! Mock camera service implementations.
//!
//! Provides a scripted camera service for testing the blocking bridge
//! without real hardware. The mock delivers notifications from a spawned
//! thread, never on the caller's thread, matching the delivery model of a
//! real camera service.
//!
//! # Available mocks
//!
//! - [`MockCameraService`] - scripted open outcome with configurable delay
//! - [`MockDevice`] / [`MockSession`] - close-tracking handles

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::debug;

use crate::api::{CameraDevice, CameraService, CaptureSession, DeviceObserver};
use crate::error::CamResult;

/// How a [`MockCameraService`] resolves an open attempt.
#[derive(Clone, Copy, Debug)]
pub enum MockOpenOutcome {
    /// Deliver `on_opened` with a fresh device.
    Opened,
    /// Deliver `on_disconnected`.
    Disconnected,
    /// Deliver `on_error` with this code.
    Error(i32),
    /// Never deliver anything; the open attempt must time out.
    Silent,
}

/// Camera device handle with close tracking.
#[derive(Debug)]
pub struct MockDevice {
    id: String,
    closed: AtomicBool,
}

impl MockDevice {
    /// Creates an open device with the given identifier.
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            closed: AtomicBool::new(false),
        }
    }

    /// True once [`CameraDevice::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl CameraDevice for MockDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("MockDevice '{}' closed", self.id);
        }
    }
}

/// Capture session handle with close tracking.
#[derive(Debug)]
pub struct MockSession {
    device_id: String,
    closed: AtomicBool,
}

impl MockSession {
    /// Creates a session belonging to `device_id`.
    pub fn new(device_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            closed: AtomicBool::new(false),
        }
    }

    /// True once [`CaptureSession::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl CaptureSession for MockSession {
    fn device_id(&self) -> &str {
        &self.device_id
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("MockSession for '{}' closed", self.device_id);
        }
    }
}

/// Scripted camera service.
///
/// Each open request spawns a delivery thread that sleeps for the
/// configured delay and then reports the scripted outcome. The last device
/// created is retained so tests can assert on [`MockDevice::is_closed`]
/// after a failed or timed-out open.
pub struct MockCameraService {
    outcome: MockOpenOutcome,
    delay: Duration,
    last_device: Mutex<Option<Arc<MockDevice>>>,
}

impl MockCameraService {
    /// Creates a service that resolves opens with `outcome` after `delay`.
    pub fn new(outcome: MockOpenOutcome, delay: Duration) -> Self {
        Self {
            outcome,
            delay,
            last_device: Mutex::new(None),
        }
    }

    /// The device created by the most recent open request, if any.
    pub fn last_device(&self) -> Option<Arc<MockDevice>> {
        self.last_device
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl CameraService for MockCameraService {
    fn open_device(&self, device_id: &str, observer: Arc<dyn DeviceObserver>) -> CamResult<()> {
        let outcome = self.outcome;
        if matches!(outcome, MockOpenOutcome::Silent) {
            debug!("MockCameraService: staying silent for '{device_id}'");
            return Ok(());
        }

        let device = Arc::new(MockDevice::new(device_id));
        *self
            .last_device
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = Some(Arc::clone(&device));

        let delay = self.delay;
        let device_id = device_id.to_string();
        thread::spawn(move || {
            if !delay.is_zero() {
                thread::sleep(delay);
            }
            let device: Arc<dyn CameraDevice> = device;
            match outcome {
                MockOpenOutcome::Opened => {
                    debug!("MockCameraService: '{device_id}' opened");
                    observer.on_opened(&device);
                }
                MockOpenOutcome::Disconnected => {
                    debug!("MockCameraService: '{device_id}' disconnected");
                    observer.on_disconnected(&device);
                }
                MockOpenOutcome::Error(code) => {
                    debug!("MockCameraService: '{device_id}' errored with {code}");
                    observer.on_error(&device, code);
                }
                MockOpenOutcome::Silent => unreachable!("handled before spawning"),
            }
        });

        Ok(())
    }
}
