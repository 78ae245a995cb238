//! One-shot synchronized cell.
//!
//! A `SyncCell` is the blocking analogue of a single-shot future: writers
//! may set it any number of times (idempotent overwrite), readers block
//! until the first write has happened. It backs
//! [`SessionLifecycleWatcher::wait_and_get_session`], where every session
//! notification re-sets the same session reference and a reader only cares
//! that *some* notification has arrived.
//!
//! [`SessionLifecycleWatcher::wait_and_get_session`]:
//! crate::blocking::session::SessionLifecycleWatcher::wait_and_get_session

use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// A write-many, read-blocking cell.
///
/// Unlike a channel there is no consumption: once set, every reader sees
/// the latest value immediately.
pub struct SyncCell<T> {
    slot: Mutex<Option<T>>,
    cond: Condvar,
}

impl<T: Clone> SyncCell<T> {
    /// Creates an empty cell.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            cond: Condvar::new(),
        }
    }

    /// Stores `value`, replacing any previous value, and wakes all blocked
    /// readers.
    pub fn set(&self, value: T) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(value);
        self.cond.notify_all();
    }

    /// Snapshot of the current value without blocking.
    pub fn get(&self) -> Option<T> {
        self.slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Blocks until the cell has been set, returning a clone of the value,
    /// or `None` if `timeout` elapses first.
    pub fn wait_for(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());

        loop {
            if let Some(value) = slot.as_ref() {
                return Some(value.clone());
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }

            let (guard, _timed_out) = self
                .cond
                .wait_timeout(slot, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            slot = guard;
        }
    }
}

impl<T: Clone> Default for SyncCell<T> {
    fn default() -> Self {
        Self::new()
    }
}
