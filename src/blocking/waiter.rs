//! Generic single-waiter blocking queue over a fixed set of named states.
//!
//! A `StateWaiter` sits between a notification callback (the producer) and a
//! client thread that wants to treat an asynchronous state change as a
//! synchronous event (the consumer). The producer calls [`StateWaiter::record`]
//! from the callback thread; the consumer blocks in
//! [`StateWaiter::wait_for_any`] until one of the states it cares about has
//! been recorded, draining and discarding everything else in delivery order.
//!
//! Transitions are never dropped: anything recorded is either consumed by a
//! matching wait or stays queued for a future wait. A wait that races ahead
//! of its notification therefore still succeeds, and a notification that
//! races ahead of its wait is not lost.
//!
//! Exactly one thread may block on a given waiter at a time; a second
//! concurrent wait fails immediately with [`CamError::AlreadyWaiting`]
//! instead of queuing.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use log::trace;

use crate::error::{CamError, CamResult};

struct WaiterInner {
    /// Recorded transitions in delivery order.
    queue: VecDeque<u32>,
    /// Set while a thread is blocked inside `wait_for_any`.
    waiting: bool,
}

/// Blocking queue of state transitions with single-waiter semantics.
///
/// State values are indexes into the name slice supplied at construction;
/// recording or awaiting a value outside that range is a programmer error
/// and panics.
pub struct StateWaiter {
    names: &'static [&'static str],
    inner: Mutex<WaiterInner>,
    cond: Condvar,
}

impl StateWaiter {
    /// Creates a waiter over the closed state set named by `names`.
    ///
    /// Valid state values are `0..names.len()`.
    pub fn new(names: &'static [&'static str]) -> Self {
        Self {
            names,
            inner: Mutex::new(WaiterInner {
                queue: VecDeque::new(),
                waiting: false,
            }),
            cond: Condvar::new(),
        }
    }

    /// Number of states in the declared set.
    pub fn state_count(&self) -> u32 {
        self.names.len() as u32
    }

    /// Human-readable name for `state`.
    ///
    /// # Panics
    ///
    /// Panics if `state` is outside the declared set.
    pub fn state_name(&self, state: u32) -> &'static str {
        self.assert_in_range(state);
        self.names[state as usize]
    }

    fn assert_in_range(&self, state: u32) {
        assert!(
            (state as usize) < self.names.len(),
            "state {} out of range (declared set has {} states)",
            state,
            self.names.len()
        );
    }

    fn describe(&self, states: &[u32]) -> String {
        states
            .iter()
            .map(|&s| self.names[s as usize])
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Appends an observed transition to the queue and wakes a pending
    /// waiter, if any.
    ///
    /// Called from the notification-delivery thread. Never blocks.
    ///
    /// # Panics
    ///
    /// Panics if `state` is outside the declared set. An invalid value here
    /// is a wiring bug in the watcher feeding this waiter, not a condition
    /// a caller can recover from.
    pub fn record(&self, state: u32) {
        self.assert_in_range(state);
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.queue.push_back(state);
        self.cond.notify_one();
    }

    /// Blocks until `state` is recorded or `timeout` elapses.
    ///
    /// Convenience form of [`StateWaiter::wait_for_any`] for a single state.
    pub fn wait_for_state(&self, state: u32, timeout: Duration) -> CamResult<()> {
        self.wait_for_any(&[state], timeout).map(|_| ())
    }

    /// Blocks until the first queued transition that belongs to `states`
    /// arrives, returning that state.
    ///
    /// Transitions are consumed in delivery order; any queued transition not
    /// in `states` is discarded, never replayed. The timeout is a whole-call
    /// wall-clock budget: it keeps running while non-matching transitions
    /// are drained and is not reset between them.
    ///
    /// # Errors
    ///
    /// - [`CamError::AlreadyWaiting`] if another thread is blocked on this
    ///   waiter; returned immediately without touching the queue.
    /// - [`CamError::WaitTimeout`] naming the awaited states if the budget
    ///   expires first.
    ///
    /// # Panics
    ///
    /// Panics if any value in `states` is outside the declared set.
    pub fn wait_for_any(&self, states: &[u32], timeout: Duration) -> CamResult<u32> {
        for &state in states {
            self.assert_in_range(state);
        }

        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.waiting {
            return Err(CamError::AlreadyWaiting);
        }
        inner.waiting = true;

        loop {
            // Drain in delivery order; the first match wins.
            while let Some(observed) = inner.queue.pop_front() {
                if states.contains(&observed) {
                    inner.waiting = false;
                    return Ok(observed);
                }
                trace!(
                    "discarding transition {} while waiting for [{}]",
                    self.names[observed as usize],
                    self.describe(states)
                );
            }

            let now = Instant::now();
            if now >= deadline {
                inner.waiting = false;
                return Err(CamError::WaitTimeout {
                    timeout_ms: timeout.as_millis() as u64,
                    states: self.describe(states),
                });
            }

            let (guard, _timed_out) = self
                .cond
                .wait_timeout(inner, deadline - now)
                .unwrap_or_else(|e| e.into_inner());
            inner = guard;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    static TEST_STATES: [&str; 4] = ["OPENED", "CLOSED", "DISCONNECTED", "ERROR"];
    const OPENED: u32 = 0;
    const CLOSED: u32 = 1;
    const DISCONNECTED: u32 = 2;
    const ERROR: u32 = 3;

    fn waiter() -> StateWaiter {
        StateWaiter::new(&TEST_STATES)
    }

    #[test]
    fn test_pre_recorded_state_returns_immediately() {
        let w = waiter();
        w.record(OPENED);

        let start = Instant::now();
        let got = w
            .wait_for_any(&[OPENED, ERROR], Duration::from_millis(1000))
            .unwrap();
        assert_eq!(got, OPENED);
        assert!(
            start.elapsed() < Duration::from_millis(500),
            "matching transition was already queued; wait should not block"
        );
    }

    #[test]
    fn test_first_matching_transition_wins_in_delivery_order() {
        let w = waiter();
        w.record(CLOSED);
        w.record(DISCONNECTED);
        w.record(ERROR);
        w.record(OPENED);

        // CLOSED and DISCONNECTED are discarded; ERROR is the first match.
        let got = w
            .wait_for_any(&[OPENED, ERROR], Duration::from_millis(100))
            .unwrap();
        assert_eq!(got, ERROR);

        // OPENED stayed queued for the next wait.
        let got = w
            .wait_for_state(OPENED, Duration::from_millis(100))
            .map(|_| OPENED)
            .unwrap();
        assert_eq!(got, OPENED);
    }

    #[test]
    fn test_discarded_transitions_are_never_replayed() {
        let w = waiter();
        w.record(CLOSED);
        w.record(OPENED);

        w.wait_for_state(OPENED, Duration::from_millis(100)).unwrap();

        // CLOSED was drained and dropped while waiting for OPENED above.
        let err = w
            .wait_for_state(CLOSED, Duration::from_millis(50))
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_timeout_names_awaited_states() {
        let w = waiter();
        let start = Instant::now();
        let err = w
            .wait_for_any(&[CLOSED], Duration::from_millis(50))
            .unwrap_err();
        let elapsed = start.elapsed();

        assert!(elapsed >= Duration::from_millis(50));
        assert!(
            elapsed < Duration::from_millis(500),
            "timeout overshot: {elapsed:?}"
        );
        assert!(err.to_string().contains("CLOSED"), "message: {err}");
    }

    #[test]
    fn test_budget_spans_non_matching_transitions() {
        let w = Arc::new(waiter());
        let producer = {
            let w = Arc::clone(&w);
            thread::spawn(move || {
                // Keep feeding non-matching transitions; the budget must not
                // reset on each one.
                for _ in 0..20 {
                    thread::sleep(Duration::from_millis(10));
                    w.record(CLOSED);
                }
            })
        };

        let start = Instant::now();
        let err = w
            .wait_for_state(OPENED, Duration::from_millis(80))
            .unwrap_err();
        assert!(err.is_timeout());
        assert!(
            start.elapsed() < Duration::from_millis(190),
            "budget was extended by non-matching transitions"
        );
        producer.join().unwrap();
    }

    #[test]
    fn test_second_concurrent_waiter_fails_fast() {
        let w = Arc::new(waiter());
        let blocked = {
            let w = Arc::clone(&w);
            thread::spawn(move || w.wait_for_state(OPENED, Duration::from_millis(400)))
        };

        // Let the first waiter take exclusivity.
        thread::sleep(Duration::from_millis(100));

        let start = Instant::now();
        let err = w
            .wait_for_state(OPENED, Duration::from_millis(400))
            .unwrap_err();
        assert!(
            matches!(err, CamError::AlreadyWaiting),
            "expected AlreadyWaiting, got: {err}"
        );
        assert!(
            start.elapsed() < Duration::from_millis(100),
            "concurrency violation must not block"
        );

        // Unblock the first waiter.
        w.record(OPENED);
        blocked.join().unwrap().unwrap();
    }

    #[test]
    fn test_exclusivity_released_after_timeout() {
        let w = waiter();
        let err = w
            .wait_for_state(OPENED, Duration::from_millis(20))
            .unwrap_err();
        assert!(err.is_timeout());

        w.record(OPENED);
        w.wait_for_state(OPENED, Duration::from_millis(100)).unwrap();
    }

    #[test]
    fn test_wait_unblocks_on_record_from_other_thread() {
        let w = Arc::new(waiter());
        let producer = {
            let w = Arc::clone(&w);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                w.record(DISCONNECTED);
            })
        };

        let got = w
            .wait_for_any(&[OPENED, DISCONNECTED, ERROR], Duration::from_millis(1000))
            .unwrap();
        assert_eq!(got, DISCONNECTED);
        producer.join().unwrap();
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_record_out_of_range_panics() {
        waiter().record(4);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_wait_out_of_range_panics() {
        let _ = waiter().wait_for_any(&[OPENED, 99], Duration::from_millis(10));
    }

    #[test]
    fn test_state_names() {
        let w = waiter();
        assert_eq!(w.state_count(), 4);
        assert_eq!(w.state_name(ERROR), "ERROR");
    }
}
