//! Blocking watcher for capture session lifecycle callbacks.
//!
//! `SessionLifecycleWatcher` is installed as the [`SessionObserver`] of a
//! session being configured. For every notification it forwards to an
//! optional external proxy first, then remembers the session reference, then
//! records the named state into its [`StateWaiter`]. A client thread can
//! then block for a particular lifecycle state, or (more commonly) call
//! [`SessionLifecycleWatcher::wait_and_get_session`] to get the session
//! reference as soon as *any* notification has been delivered, without
//! reasoning about which state arrived first.

use std::sync::Arc;
use std::time::Duration;

use crate::api::{CaptureSession, SessionObserver};
use crate::blocking::cell::SyncCell;
use crate::blocking::waiter::StateWaiter;
use crate::error::{CamError, CamResult};

/// Session finished configuring.
pub const SESSION_CONFIGURED: u32 = 0;
/// Session configuration failed.
pub const SESSION_CONFIGURE_FAILED: u32 = 1;
/// Session has no in-flight requests.
pub const SESSION_READY: u32 = 2;
/// Session started processing requests.
pub const SESSION_ACTIVE: u32 = 3;
/// Session was closed.
pub const SESSION_CLOSED: u32 = 4;

static SESSION_STATE_NAMES: [&str; 5] = [
    "CONFIGURED",
    "CONFIGURE_FAILED",
    "READY",
    "ACTIVE",
    "CLOSED",
];

/// Tees session lifecycle callbacks to a proxy while feeding a state queue
/// and a one-shot session cell.
pub struct SessionLifecycleWatcher {
    proxy: Option<Arc<dyn SessionObserver>>,
    waiter: StateWaiter,
    session: SyncCell<Arc<dyn CaptureSession>>,
}

impl SessionLifecycleWatcher {
    /// Creates a watcher. If `proxy` is supplied it receives every
    /// notification, synchronously on the delivery thread, before any
    /// internal bookkeeping.
    pub fn new(proxy: Option<Arc<dyn SessionObserver>>) -> Self {
        Self {
            proxy,
            waiter: StateWaiter::new(&SESSION_STATE_NAMES),
            session: SyncCell::new(),
        }
    }

    /// The state queue fed by this watcher, for `wait_for_any`-style calls
    /// against the `SESSION_*` constants.
    pub fn waiter(&self) -> &StateWaiter {
        &self.waiter
    }

    /// Blocks until any session notification has delivered a session
    /// reference, or fails with [`CamError::SessionTimeout`].
    ///
    /// Deliberately decoupled from the state queue: the first notification
    /// of *any* kind satisfies this call, and it does not consume state
    /// transitions.
    pub fn wait_and_get_session(&self, timeout: Duration) -> CamResult<Arc<dyn CaptureSession>> {
        self.session
            .wait_for(timeout)
            .ok_or(CamError::SessionTimeout {
                timeout_ms: timeout.as_millis() as u64,
            })
    }

    /// Proxy first, then session cell, then state queue. The relative order
    /// of the first and last step is the watcher's consistency guarantee.
    fn dispatch(
        &self,
        session: &Arc<dyn CaptureSession>,
        state: u32,
        forward: impl FnOnce(&Arc<dyn SessionObserver>),
    ) {
        if let Some(proxy) = &self.proxy {
            forward(proxy);
        }
        self.session.set(Arc::clone(session));
        self.waiter.record(state);
    }
}

impl SessionObserver for SessionLifecycleWatcher {
    fn on_configured(&self, session: &Arc<dyn CaptureSession>) {
        self.dispatch(session, SESSION_CONFIGURED, |p| p.on_configured(session));
    }

    fn on_configure_failed(&self, session: &Arc<dyn CaptureSession>) {
        self.dispatch(session, SESSION_CONFIGURE_FAILED, |p| {
            p.on_configure_failed(session)
        });
    }

    fn on_ready(&self, session: &Arc<dyn CaptureSession>) {
        self.dispatch(session, SESSION_READY, |p| p.on_ready(session));
    }

    fn on_active(&self, session: &Arc<dyn CaptureSession>) {
        self.dispatch(session, SESSION_ACTIVE, |p| p.on_active(session));
    }

    fn on_closed(&self, session: &Arc<dyn CaptureSession>) {
        self.dispatch(session, SESSION_CLOSED, |p| p.on_closed(session));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSession;
    use std::sync::Mutex;
    use std::thread;
    use std::time::Instant;

    fn mock_session() -> Arc<dyn CaptureSession> {
        Arc::new(MockSession::new("0"))
    }

    /// Proxy that records which callbacks ran, in order.
    struct RecordingProxy {
        calls: Mutex<Vec<&'static str>>,
    }

    impl RecordingProxy {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl SessionObserver for RecordingProxy {
        fn on_configured(&self, _session: &Arc<dyn CaptureSession>) {
            self.calls.lock().unwrap().push("configured");
        }
        fn on_ready(&self, _session: &Arc<dyn CaptureSession>) {
            self.calls.lock().unwrap().push("ready");
        }
        fn on_closed(&self, _session: &Arc<dyn CaptureSession>) {
            self.calls.lock().unwrap().push("closed");
        }
    }

    #[test]
    fn test_states_recorded_in_delivery_order() {
        let watcher = SessionLifecycleWatcher::new(None);
        let session = mock_session();

        watcher.on_configured(&session);
        watcher.on_ready(&session);
        watcher.on_active(&session);

        let waiter = watcher.waiter();
        waiter
            .wait_for_state(SESSION_CONFIGURED, Duration::from_millis(100))
            .unwrap();
        waiter
            .wait_for_state(SESSION_READY, Duration::from_millis(100))
            .unwrap();
        waiter
            .wait_for_state(SESSION_ACTIVE, Duration::from_millis(100))
            .unwrap();
    }

    #[test]
    fn test_proxy_forwarded_before_state_visible() {
        let proxy = Arc::new(RecordingProxy::new());
        let watcher = Arc::new(SessionLifecycleWatcher::new(Some(
            proxy.clone() as Arc<dyn SessionObserver>
        )));

        let consumer = {
            let watcher = Arc::clone(&watcher);
            let proxy = Arc::clone(&proxy);
            thread::spawn(move || {
                watcher
                    .waiter()
                    .wait_for_state(SESSION_CONFIGURED, Duration::from_millis(1000))
                    .unwrap();
                // If the wait released, the proxy call must already be
                // recorded: forwarding happens-before recording.
                assert_eq!(proxy.calls.lock().unwrap().as_slice(), ["configured"]);
            })
        };

        thread::sleep(Duration::from_millis(50));
        watcher.on_configured(&mock_session());
        consumer.join().unwrap();
    }

    #[test]
    fn test_any_notification_satisfies_session_wait() {
        let watcher = Arc::new(SessionLifecycleWatcher::new(None));
        let producer = {
            let watcher = Arc::clone(&watcher);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                // Not "configured" -- any notification kind carries the
                // session and must satisfy the wait.
                watcher.on_active(&mock_session());
            })
        };

        let session = watcher
            .wait_and_get_session(Duration::from_millis(1000))
            .unwrap();
        assert_eq!(session.device_id(), "0");
        producer.join().unwrap();
    }

    #[test]
    fn test_session_wait_timeout() {
        let watcher = SessionLifecycleWatcher::new(None);
        let start = Instant::now();
        let err = watcher
            .wait_and_get_session(Duration::from_millis(50))
            .unwrap_err();
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert!(
            matches!(err, CamError::SessionTimeout { .. }),
            "expected SessionTimeout, got: {err}"
        );
    }

    #[test]
    fn test_session_wait_does_not_consume_states() {
        let watcher = SessionLifecycleWatcher::new(None);
        watcher.on_configured(&mock_session());

        watcher
            .wait_and_get_session(Duration::from_millis(100))
            .unwrap();

        // The CONFIGURED transition is still queued for a state wait.
        watcher
            .waiter()
            .wait_for_state(SESSION_CONFIGURED, Duration::from_millis(100))
            .unwrap();
    }

    #[test]
    fn test_null_proxy_is_valid() {
        let watcher = SessionLifecycleWatcher::new(None);
        watcher.on_closed(&mock_session());
        watcher
            .waiter()
            .wait_for_state(SESSION_CLOSED, Duration::from_millis(100))
            .unwrap();
    }
}
