//! End-to-end test of the blocking bridge against the mock camera service:
//! open a device, watch a session come up, follow a capture, and drive the
//! autofocus machine from the results stream.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use cam_bridge::blocking::capture::{CAPTURE_COMPLETED, CAPTURE_FAILED, CAPTURE_STARTED};
use cam_bridge::blocking::session::{SESSION_ACTIVE, SESSION_CONFIGURED};
use cam_bridge::mock::{MockCameraService, MockOpenOutcome, MockSession};
use cam_bridge::{
    af, open_device, AutoFocusListener, AutoFocusStateMachine, CaptureObserver,
    CaptureProgressWatcher, CaptureResult, CaptureSession, RequestBuilder,
    SessionLifecycleWatcher, SessionObserver,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn result_with_af(frame_number: u64, af_state: i32, af_mode: i32) -> CaptureResult {
    CaptureResult {
        request_id: 1,
        frame_number,
        af_state: Some(af_state),
        af_mode: Some(af_mode),
    }
}

#[test]
fn test_open_then_configure_then_capture() {
    init_logging();

    // Open the device synchronously through the scripted service.
    let service = MockCameraService::new(MockOpenOutcome::Opened, Duration::from_millis(10));
    let device = open_device(&service, "back", None).expect("open should succeed");
    assert_eq!(device.id(), "back");

    // Configure a session; callbacks arrive from a service-side thread.
    let watcher = Arc::new(SessionLifecycleWatcher::new(None));
    let delivery = {
        let watcher = Arc::clone(&watcher);
        thread::spawn(move || {
            let session: Arc<dyn CaptureSession> = Arc::new(MockSession::new("back"));
            thread::sleep(Duration::from_millis(20));
            watcher.on_configured(&session);
            thread::sleep(Duration::from_millis(10));
            watcher.on_active(&session);
        })
    };

    let session = watcher
        .wait_and_get_session(Duration::from_millis(1000))
        .expect("session should become available");
    assert_eq!(session.device_id(), "back");

    let waiter = watcher.waiter();
    waiter
        .wait_for_state(SESSION_CONFIGURED, Duration::from_millis(1000))
        .expect("configured transition should be queued");
    waiter
        .wait_for_state(SESSION_ACTIVE, Duration::from_millis(1000))
        .expect("active transition should follow");
    delivery.join().unwrap();

    // Follow a single capture to completion.
    let capture = Arc::new(CaptureProgressWatcher::new(None));
    let delivery = {
        let capture = Arc::clone(&capture);
        thread::spawn(move || {
            capture.on_capture_started(1, 1_000);
            capture.on_capture_completed(&result_with_af(
                1,
                af::STATE_INACTIVE,
                af::MODE_CONTINUOUS_PICTURE,
            ));
        })
    };

    let got = capture
        .waiter()
        .wait_for_any(
            &[CAPTURE_COMPLETED, CAPTURE_FAILED],
            Duration::from_millis(1000),
        )
        .expect("capture should resolve");
    assert_eq!(got, CAPTURE_COMPLETED, "capture must complete, not fail");
    delivery.join().unwrap();

    device.close();
}

/// Proxy chaining: the external observer sees every notification the
/// internal machinery sees, before any waiter can unblock because of it.
#[test]
fn test_external_observer_still_sees_every_notification() {
    init_logging();

    struct Tally {
        calls: Mutex<Vec<&'static str>>,
    }
    impl SessionObserver for Tally {
        fn on_configured(&self, _s: &Arc<dyn CaptureSession>) {
            self.calls.lock().unwrap().push("configured");
        }
        fn on_ready(&self, _s: &Arc<dyn CaptureSession>) {
            self.calls.lock().unwrap().push("ready");
        }
        fn on_active(&self, _s: &Arc<dyn CaptureSession>) {
            self.calls.lock().unwrap().push("active");
        }
        fn on_closed(&self, _s: &Arc<dyn CaptureSession>) {
            self.calls.lock().unwrap().push("closed");
        }
    }

    let tally = Arc::new(Tally {
        calls: Mutex::new(Vec::new()),
    });
    let watcher = SessionLifecycleWatcher::new(Some(tally.clone() as Arc<dyn SessionObserver>));

    let session: Arc<dyn CaptureSession> = Arc::new(MockSession::new("front"));
    watcher.on_configured(&session);
    watcher.on_ready(&session);
    watcher.on_active(&session);
    watcher.on_closed(&session);

    assert_eq!(
        tally.calls.lock().unwrap().as_slice(),
        ["configured", "ready", "active", "closed"],
        "proxy must receive every notification exactly once, in order"
    );
}

/// Lock autofocus, feed the results stream until convergence, and check the
/// focus machine reports a locked success for the still capture.
#[test]
fn test_focus_lock_flow_over_results_stream() {
    init_logging();

    struct LockWatch {
        locked_success: Mutex<Option<u64>>,
    }
    impl AutoFocusListener for LockWatch {
        fn on_auto_focus_success(&self, result: &CaptureResult, locked: bool) {
            if locked {
                *self.locked_success.lock().unwrap() = Some(result.frame_number);
            }
        }
        fn on_auto_focus_fail(&self, _result: &CaptureResult, _locked: bool) {}
        fn on_auto_focus_scan(&self, _result: &CaptureResult) {}
        fn on_auto_focus_inactive(&self, _result: &CaptureResult) {}
    }

    let listener = Arc::new(LockWatch {
        locked_success: Mutex::new(None),
    });
    let machine = AutoFocusStateMachine::new(listener.clone() as Arc<dyn AutoFocusListener>);

    let mut repeating = RequestBuilder::new();
    let mut request = RequestBuilder::new();
    machine.set_passive_auto_focus(true, &mut repeating);
    machine.lock_auto_focus(&mut repeating, &mut request);
    assert_eq!(request.af_trigger(), Some(af::TRIGGER_START));

    // Results stream: repeated scan frames, then convergence. Repeats must
    // not re-dispatch.
    let mode = af::MODE_CONTINUOUS_PICTURE;
    machine.on_capture_completed(&result_with_af(1, af::STATE_PASSIVE_SCAN, mode));
    machine.on_capture_completed(&result_with_af(2, af::STATE_PASSIVE_SCAN, mode));
    machine.on_capture_completed(&result_with_af(3, af::STATE_FOCUSED_LOCKED, mode));
    machine.on_capture_completed(&result_with_af(4, af::STATE_FOCUSED_LOCKED, mode));

    assert_eq!(
        *listener.locked_success.lock().unwrap(),
        Some(3),
        "locked success must fire exactly once, on the converging frame"
    );
}

/// The capture watcher chains to a proxy while a second thread blocks on
/// the waiter; the proxy call must be visible before the wait releases.
#[test]
fn test_capture_proxy_ordering_under_concurrency() {
    init_logging();

    struct Stamp {
        started: Mutex<Option<std::time::Instant>>,
    }
    impl CaptureObserver for Stamp {
        fn on_capture_started(&self, _request_id: u64, _timestamp_ns: i64) {
            *self.started.lock().unwrap() = Some(std::time::Instant::now());
        }
    }

    let stamp = Arc::new(Stamp {
        started: Mutex::new(None),
    });
    let watcher = Arc::new(CaptureProgressWatcher::new(
        Some(stamp.clone() as Arc<dyn CaptureObserver>),
    ));

    let consumer = {
        let watcher = Arc::clone(&watcher);
        let stamp = Arc::clone(&stamp);
        thread::spawn(move || {
            watcher
                .waiter()
                .wait_for_state(CAPTURE_STARTED, Duration::from_millis(1000))
                .expect("started transition should arrive");
            assert!(
                stamp.started.lock().unwrap().is_some(),
                "proxy must have run before the wait released"
            );
        })
    };

    thread::sleep(Duration::from_millis(30));
    watcher.on_capture_started(9, 0);
    consumer.join().unwrap();
}
