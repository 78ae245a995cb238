//! Autofocus state machine.
//!
//! Converts the raw `(af_state, af_mode)` pair carried by each capture
//! result into semantic focus callbacks, deduplicating repeats: requests
//! are mutated only when the caller manipulates AF, but camera-initiated AF
//! state changes are broadcast from every new result.
//!
//! The machine is pure and synchronous: it never blocks and owns no
//! threads. All public operations are mutually exclusive on the machine's
//! internal state, so observations and triggers may race from different
//! threads. Listener callbacks are dispatched outside the internal lock.
//!
//! In-flight lock / active-scan operations are bracketed by a named timing
//! span: starting a new one force-closes any span left open, and the
//! terminal locked states close the open span exactly once. Spans are
//! diagnostics only; open/close and elapsed time go to the `debug` log.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use log::{debug, trace, warn};

use crate::api::{af, CaptureResult, RequestBuilder};

/// Observer of semantic focus transitions dispatched by
/// [`AutoFocusStateMachine::on_capture_completed`].
pub trait AutoFocusListener: Send + Sync {
    /// The camera is focused. `locked` is true if the lens is locked from
    /// moving (active AF), false for a passive convergence.
    fn on_auto_focus_success(&self, result: &CaptureResult, locked: bool);

    /// The camera failed to focus. `locked` is true if the lens is locked
    /// and a restart is needed, false if passive AF is still scanning.
    fn on_auto_focus_fail(&self, result: &CaptureResult, locked: bool);

    /// The camera is scanning (active or passive) and has not converged.
    fn on_auto_focus_scan(&self, result: &CaptureResult);

    /// Autofocus is off, or in an intermediate state between scans.
    fn on_auto_focus_inactive(&self, result: &CaptureResult);
}

struct FocusSpan {
    name: &'static str,
    cookie: u32,
    started: Instant,
}

struct AfInner {
    last_af_state: Option<i32>,
    last_af_mode: Option<i32>,
    current_af_mode: Option<i32>,
    current_af_trigger: Option<i32>,
    span: Option<FocusSpan>,
    last_cookie: u32,
}

enum FocusEvent {
    Success { locked: bool },
    Fail { locked: bool },
    Scan,
    Inactive,
}

/// Maps raw autofocus observations to [`AutoFocusListener`] events and
/// maintains the intended trigger/mode for capture requests.
pub struct AutoFocusStateMachine {
    listener: Arc<dyn AutoFocusListener>,
    inner: Mutex<AfInner>,
}

impl AutoFocusStateMachine {
    /// Creates a machine dispatching to `listener`.
    pub fn new(listener: Arc<dyn AutoFocusListener>) -> Self {
        Self {
            listener,
            inner: Mutex::new(AfInner {
                last_af_state: None,
                last_af_mode: None,
                current_af_mode: None,
                current_af_trigger: None,
                span: None,
                last_cookie: 0,
            }),
        }
    }

    fn lock_inner(&self) -> MutexGuard<'_, AfInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Feeds one capture result into the machine.
    ///
    /// Call this for every new result; without a regular feed no focus
    /// changes are observed. A result missing either the AF state or the AF
    /// mode is logged and skipped; upstream data loss is expected
    /// occasionally and favoring availability over strictness is deliberate
    /// here. A pair identical to the previous observation dispatches
    /// nothing; unknown state values update the dedup memory but dispatch
    /// nothing.
    ///
    /// The dedup decision and the listener call are not one atomic step:
    /// the listener runs after the internal lock is released, so two calls
    /// racing in from different threads may deliver their events out of
    /// order relative to the state updates. Feed results from a single
    /// thread when event order matters.
    pub fn on_capture_completed(&self, result: &CaptureResult) {
        let event = {
            let mut inner = self.lock_inner();

            let af_state = match result.af_state {
                Some(state) => state,
                None => {
                    warn!("on_capture_completed - missing af_state, skipping AF update");
                    return;
                }
            };
            let af_mode = match result.af_mode {
                Some(mode) => mode,
                None => {
                    warn!("on_capture_completed - missing af_mode, skipping AF update");
                    return;
                }
            };

            debug!("on_capture_completed - new AF mode = {af_mode} new AF state = {af_state}");

            if inner.last_af_state == Some(af_state) && inner.last_af_mode == Some(af_mode) {
                // Same pair as last time, nothing else needs to be done.
                return;
            }

            inner.last_af_state = Some(af_state);
            inner.last_af_mode = Some(af_mode);

            match af_state {
                af::STATE_FOCUSED_LOCKED => {
                    Self::end_span(&mut inner);
                    Some(FocusEvent::Success { locked: true })
                }
                af::STATE_NOT_FOCUSED_LOCKED => {
                    Self::end_span(&mut inner);
                    Some(FocusEvent::Fail { locked: true })
                }
                af::STATE_PASSIVE_FOCUSED => Some(FocusEvent::Success { locked: false }),
                af::STATE_PASSIVE_UNFOCUSED => Some(FocusEvent::Fail { locked: false }),
                af::STATE_ACTIVE_SCAN | af::STATE_PASSIVE_SCAN => Some(FocusEvent::Scan),
                af::STATE_INACTIVE => Some(FocusEvent::Inactive),
                unknown => {
                    // Forward compatibility: unknown states are ignored.
                    trace!("on_capture_completed - ignoring unknown AF state {unknown}");
                    None
                }
            }
        };

        match event {
            Some(FocusEvent::Success { locked }) => {
                self.listener.on_auto_focus_success(result, locked);
            }
            Some(FocusEvent::Fail { locked }) => {
                self.listener.on_auto_focus_fail(result, locked);
            }
            Some(FocusEvent::Scan) => self.listener.on_auto_focus_scan(result),
            Some(FocusEvent::Inactive) => self.listener.on_auto_focus_inactive(result),
            None => {}
        }
    }

    /// Forgets the last observed state so the next observation is treated
    /// as novel even if identical to one seen before.
    ///
    /// Call this after intentionally dropping results for a while;
    /// otherwise the next observation may be wrongly deduplicated.
    pub fn reset_state(&self) {
        let mut inner = self.lock_inner();
        trace!("reset_state - last state was {:?}", inner.last_af_state);
        inner.last_af_state = None;
    }

    /// Locks the lens from moving, typically before taking a picture.
    ///
    /// Applies the current AF mode to both builders, an idle trigger to the
    /// repeating request and a start trigger to the single request. Submit
    /// `request` as a one-off capture, not repeating, or the lock repeats
    /// every frame.
    ///
    /// On success [`AutoFocusListener::on_auto_focus_success`] fires with
    /// `locked == true`; on failure [`AutoFocusListener::on_auto_focus_fail`]
    /// with `locked == true`.
    ///
    /// # Panics
    ///
    /// Panics if no AF mode has been established via
    /// [`AutoFocusStateMachine::set_active_auto_focus`] or
    /// [`AutoFocusStateMachine::set_passive_auto_focus`].
    pub fn lock_auto_focus(&self, repeating: &mut RequestBuilder, request: &mut RequestBuilder) {
        let mut inner = self.lock_inner();
        trace!("lock_auto_focus");

        let mode = Self::established_mode(&inner);
        Self::begin_span(&mut inner, "af_lock");

        inner.current_af_trigger = Some(af::TRIGGER_START);

        repeating.set_af_mode(mode);
        request.set_af_mode(mode);
        repeating.set_af_trigger(af::TRIGGER_IDLE);
        request.set_af_trigger(af::TRIGGER_START);
    }

    /// Unlocks the lens, letting it move again after a picture.
    ///
    /// Once the unlock takes effect the machine reports inactive, then the
    /// mode-dependent follow-up (passive modes restart scanning).
    ///
    /// # Panics
    ///
    /// Panics if no AF mode has been established.
    pub fn unlock_auto_focus(&self, repeating: &mut RequestBuilder, request: &mut RequestBuilder) {
        let mut inner = self.lock_inner();
        trace!("unlock_auto_focus");

        let mode = Self::established_mode(&inner);
        inner.current_af_trigger = Some(af::TRIGGER_CANCEL);

        repeating.set_af_mode(mode);
        request.set_af_mode(mode);
        repeating.set_af_trigger(af::TRIGGER_IDLE);
        request.set_af_trigger(af::TRIGGER_CANCEL);
    }

    /// Enables active autofocus and immediately triggers a converging scan.
    ///
    /// Typically used when locking passive AF has failed. The scan outcome
    /// arrives as a `locked == true` success or failure event.
    pub fn set_active_auto_focus(
        &self,
        repeating: &mut RequestBuilder,
        request: &mut RequestBuilder,
    ) {
        let mut inner = self.lock_inner();
        trace!("set_active_auto_focus");

        Self::begin_span(&mut inner, "af_active_scan");
        inner.current_af_mode = Some(af::MODE_AUTO);

        repeating.set_af_mode(af::MODE_AUTO);
        request.set_af_mode(af::MODE_AUTO);
        repeating.set_af_trigger(af::TRIGGER_IDLE);
        request.set_af_trigger(af::TRIGGER_START);
    }

    /// Enables passive (continuous) autofocus on the repeating request.
    ///
    /// `picture` selects still-capture AF; otherwise video AF. While
    /// passive AF is enabled, use [`AutoFocusStateMachine::lock_auto_focus`]
    /// before taking a picture and
    /// [`AutoFocusStateMachine::unlock_auto_focus`] afterwards.
    pub fn set_passive_auto_focus(&self, picture: bool, repeating: &mut RequestBuilder) {
        let mut inner = self.lock_inner();
        trace!("set_passive_auto_focus - picture {picture}");

        let mode = if picture {
            af::MODE_CONTINUOUS_PICTURE
        } else {
            af::MODE_CONTINUOUS_VIDEO
        };
        inner.current_af_mode = Some(mode);
        repeating.set_af_mode(mode);
    }

    /// Carries the current AF mode onto a rebuilt repeating request.
    ///
    /// Used when the repeating request is recreated for unrelated metadata
    /// changes; the AF mode must be carried over for correct behavior.
    ///
    /// # Panics
    ///
    /// Panics if no AF mode has been established.
    pub fn update_repeating_request(&self, repeating: &mut RequestBuilder) {
        let inner = self.lock_inner();
        repeating.set_af_mode(Self::established_mode(&inner));
    }

    fn established_mode(inner: &AfInner) -> i32 {
        match inner.current_af_mode {
            Some(mode) => mode,
            None => panic!("AF mode was not enabled"),
        }
    }

    fn begin_span(inner: &mut AfInner, name: &'static str) {
        // Terminate any active span before beginning another one; a span is
        // never abandoned silently.
        if let Some(open) = inner.span.take() {
            debug!(
                "focus span '{}' ({}) force-closed after {:?}",
                open.name,
                open.cookie,
                open.started.elapsed()
            );
        }

        inner.last_cookie += 1;
        let cookie = inner.last_cookie;
        inner.span = Some(FocusSpan {
            name,
            cookie,
            started: Instant::now(),
        });
        debug!("focus span '{name}' ({cookie}) opened");
    }

    fn end_span(inner: &mut AfInner) {
        match inner.span.take() {
            Some(open) => debug!(
                "focus span '{}' ({}) closed after {:?}",
                open.name,
                open.cookie,
                open.started.elapsed()
            ),
            None => warn!("end_span - no focus span active"),
        }
    }

    #[cfg(test)]
    fn open_span_cookie(&self) -> Option<u32> {
        self.lock_inner().span.as_ref().map(|s| s.cookie)
    }
}
