//! Blocking bridge for asynchronous camera device and session callbacks.
//!
//! Camera services report everything (device opened, session configured,
//! capture completed) through observer callbacks on an internal thread.
//! This crate lets client code run those flows synchronously with bounded
//! waits, without losing notifications that race ahead of the wait and
//! without hiding any notification from an externally supplied observer.
//!
//! The building blocks:
//!
//! - [`blocking::waiter::StateWaiter`]: block one thread until one of a
//!   declared set of states is recorded.
//! - [`blocking::session::SessionLifecycleWatcher`] and
//!   [`blocking::capture::CaptureProgressWatcher`]: observer
//!   implementations that forward every callback to an optional proxy and
//!   feed a waiter.
//! - [`blocking::device::open_device`]: a bounded, blocking device open.
//! - [`focus::AutoFocusStateMachine`]: raw autofocus observations in,
//!   deduplicated semantic focus events out. Never blocks.
//!
//! The external camera service is abstracted by the traits in [`api`]; a
//! scripted implementation for tests lives in [`mock`].

pub mod api;
pub mod blocking;
pub mod error;
pub mod focus;
pub mod mock;

pub use api::{
    af, CameraDevice, CameraService, CaptureFailure, CaptureObserver, CaptureResult,
    CaptureSession, DeviceObserver, RequestBuilder, SessionObserver,
};
pub use blocking::capture::CaptureProgressWatcher;
pub use blocking::cell::SyncCell;
pub use blocking::device::{open_device, OPEN_TIMEOUT};
pub use blocking::session::SessionLifecycleWatcher;
pub use blocking::waiter::StateWaiter;
pub use error::{CamError, CamResult};
pub use focus::{AutoFocusListener, AutoFocusStateMachine};
