//! The asynchronous-to-synchronous bridging layer.
//!
//! Everything in this module is reactive synchronization glue: it schedules
//! nothing itself. Notifications arrive on whatever thread the camera
//! service uses; client threads block in the wait calls for a bounded time.
//!
//! - [`waiter::StateWaiter`]: the generic "wait for one of N states"
//!   primitive.
//! - [`cell::SyncCell`]: one-shot blocking cell (single-shot future
//!   analogue).
//! - [`session::SessionLifecycleWatcher`] and
//!   [`capture::CaptureProgressWatcher`]: per-stream specializations that
//!   tee notifications to an external observer before feeding the waiter.
//! - [`device::open_device`]: the bounded blocking open sequence.

pub mod capture;
pub mod cell;
pub mod device;
pub mod session;
pub mod waiter;
