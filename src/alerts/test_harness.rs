//! Headless popover harness for interaction-flow tests.
//!
//! Drives the controller through the driver on a virtual clock and captures a
//! frame after every step, so tests can assert on the whole history instead of
//! only the final state.
//!
//! ```rust,ignore
//! let mut h = PopoverHarness::default();
//! h.feed(vec![Alert::error("offline")]);
//! h.advance_ms(500);
//! h.enter(Region::Content);
//! h.advance_ms(10_000);
//! assert!(h.is_open());
//! ```

#![allow(dead_code)]

use std::time::Duration;

use sha2::{Digest, Sha256};

use super::controller::{AlertController, AlertMsg, AlertSnapshot, AlertTimings, Visibility};
use super::driver::{AlertDriver, millis};
use super::model::Alert;
use super::pointer::{PointerTarget, Region};
use super::timer::{CloseScheduler, VirtualClock};

// ──────────────────── frame ────────────────────

/// State captured after one harness step.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    pub at_ms: u64,
    pub step: &'static str,
    pub snapshot: AlertSnapshot,
    pub auto_shown: bool,
    pub has_shown_initial: bool,
    pub outstanding_timers: usize,
}

// ──────────────────── harness ────────────────────

pub struct PopoverHarness {
    driver: AlertDriver<VirtualClock>,
    frames: Vec<Frame>,
}

impl Default for PopoverHarness {
    fn default() -> Self {
        Self::new(AlertTimings::default())
    }
}

impl PopoverHarness {
    pub fn new(timings: AlertTimings) -> Self {
        Self {
            driver: AlertDriver::virtual_time(AlertController::new(timings)),
            frames: Vec::new(),
        }
    }

    pub fn send(&mut self, msg: AlertMsg) -> &Frame {
        let step = msg.kind();
        self.driver.dispatch(msg);
        self.capture(step)
    }

    pub fn feed(&mut self, alerts: Vec<Alert>) -> &Frame {
        self.send(AlertMsg::AlertsChanged(alerts))
    }

    pub fn enter(&mut self, region: Region) -> &Frame {
        self.send(AlertMsg::PointerEnter(region))
    }

    pub fn leave(&mut self, region: Region) -> &Frame {
        self.send(AlertMsg::PointerLeave(region))
    }

    pub fn click_trigger(&mut self) -> &Frame {
        self.send(AlertMsg::TriggerClicked)
    }

    pub fn click_outside(&mut self) -> &Frame {
        self.send(AlertMsg::PointerDown(PointerTarget::Outside))
    }

    pub fn dismiss(&mut self, index: usize) -> &Frame {
        self.send(AlertMsg::Dismiss(index))
    }

    pub fn unmount(&mut self) -> &Frame {
        self.send(AlertMsg::Unmount)
    }

    /// Advance virtual time, firing due timers.
    pub fn advance_ms(&mut self, ms: u64) -> &Frame {
        self.driver.advance_by(Duration::from_millis(ms));
        self.capture("advance")
    }

    pub fn is_open(&self) -> bool {
        self.driver.controller().is_open()
    }

    pub fn visibility(&self) -> Visibility {
        self.driver.controller().visibility()
    }

    pub fn controller(&self) -> &AlertController {
        self.driver.controller()
    }

    pub fn clock(&self) -> &VirtualClock {
        self.driver.scheduler()
    }

    pub fn driver(&self) -> &AlertDriver<VirtualClock> {
        &self.driver
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn last(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Stable digest of the frame history.
    pub fn trace_digest(&self) -> String {
        let mut hasher = Sha256::new();
        for frame in &self.frames {
            hasher.update(format!(
                "{}|{}|{:?}|{}|{}\n",
                frame.at_ms,
                frame.step,
                frame.snapshot.visibility,
                frame.snapshot.alert_count,
                frame.outstanding_timers
            ));
        }
        format!("{:x}", hasher.finalize())
    }

    fn capture(&mut self, step: &'static str) -> &Frame {
        let ctl = self.driver.controller();
        let frame = Frame {
            at_ms: millis(self.driver.scheduler().elapsed()),
            step,
            snapshot: ctl.snapshot(),
            auto_shown: ctl.is_auto_shown(),
            has_shown_initial: ctl.has_shown_initial(),
            outstanding_timers: self.driver.scheduler().outstanding(),
        };
        self.frames.push(frame);
        &self.frames[self.frames.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn first_error_auto_opens_then_closes() {
        let mut h = PopoverHarness::default();
        let f = *h.feed(vec![Alert::error("Connection lost")]);
        assert!(f.snapshot.open);
        assert!(f.auto_shown);
        assert_eq!(f.outstanding_timers, 1);

        h.advance_ms(3_000);
        assert!(!h.is_open());
        assert!(!h.last().unwrap().auto_shown);
    }

    #[test]
    fn identical_update_after_first_show_does_not_reopen() {
        let mut h = PopoverHarness::default();
        h.feed(vec![Alert::error("a")]);
        h.advance_ms(3_000);
        let f = *h.feed(vec![Alert::error("a")]);
        assert!(!f.snapshot.open);
        assert_eq!(f.outstanding_timers, 0);
    }

    #[test]
    fn hover_keeps_open_then_leave_closes_after_one_second() {
        let mut h = PopoverHarness::default();
        h.feed(vec![Alert::warning("Context nearly full")]);
        h.advance_ms(500);
        h.enter(Region::Trigger);
        // Moving trigger -> connector -> content never drops hover.
        h.enter(Region::Connector);
        h.leave(Region::Trigger);
        h.enter(Region::Content);
        h.leave(Region::Connector);
        h.advance_ms(10_000);
        assert_eq!(h.visibility(), Visibility::OpenManual);

        h.leave(Region::Content);
        h.advance_ms(999);
        assert!(h.is_open());
        h.advance_ms(1);
        assert!(!h.is_open());
        assert!(h.frames().iter().all(|f| f.outstanding_timers <= 1));
    }

    #[test]
    fn changed_list_restarts_auto_timer() {
        let mut h = PopoverHarness::default();
        h.feed(vec![Alert::error("a")]);
        h.advance_ms(2_000);
        h.feed(vec![Alert::error("a"), Alert::warning("b")]);
        h.advance_ms(2_999);
        assert!(h.is_open());
        h.advance_ms(1);
        assert!(!h.is_open());
        assert_eq!(h.clock().high_water(), 1);
    }

    #[test]
    fn outside_click_closes_and_cancels() {
        let mut h = PopoverHarness::default();
        h.feed(vec![Alert::error("x")]);
        let f = *h.click_outside();
        assert!(!f.snapshot.open);
        assert_eq!(f.outstanding_timers, 0);
    }

    #[test]
    fn empty_list_forces_closed_and_renders_nothing() {
        let mut h = PopoverHarness::default();
        h.feed(vec![Alert::error("x")]);
        h.click_trigger();
        let f = *h.feed(Vec::new());
        assert!(!f.snapshot.open);
        assert!(f.snapshot.icon.is_none());
        assert!(h.controller().view().is_none());
    }

    #[test]
    fn dismiss_runs_selected_action_and_closes() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let mut h = PopoverHarness::default();
        h.feed(vec![Alert::error("Request failed").with_action("Retry", move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })]);
        h.dismiss(3);
        h.dismiss(0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!h.is_open());
    }

    #[test]
    fn unmount_cancels_timer_and_freezes_state() {
        let mut h = PopoverHarness::default();
        h.feed(vec![Alert::error("x")]);
        let f = *h.unmount();
        assert_eq!(f.outstanding_timers, 0);
        assert!(!f.snapshot.mounted);
        h.feed(vec![Alert::error("y")]);
        assert!(!h.is_open());
    }

    #[test]
    fn trace_digest_is_deterministic() {
        let run = || {
            let mut h = PopoverHarness::default();
            h.feed(vec![Alert::warning("w")]);
            h.enter(Region::Content);
            h.leave(Region::Content);
            h.advance_ms(5_000);
            h.trace_digest()
        };
        assert_eq!(run(), run());
    }
}
