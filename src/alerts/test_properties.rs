//! Property-based tests for alert controller invariants.
//!
//! Arbitrary interleavings of data updates, pointer events, clicks, dismissals
//! and clock advances must never leave two closes armed, show `auto_shown`
//! while closed, or keep an empty popover open.

use std::time::Duration;

use proptest::prelude::*;

use super::controller::{AlertController, AlertMsg, Visibility};
use super::driver::AlertDriver;
use super::model::{Alert, Severity};
use super::pointer::{PointerTarget, Region};
use super::timer::VirtualClock;

// ──────────────────── strategies ────────────────────

#[derive(Debug, Clone)]
enum Op {
    Msg(AlertMsg),
    Advance(u64),
}

fn arb_region() -> impl Strategy<Value = Region> {
    prop_oneof![
        Just(Region::Trigger),
        Just(Region::Connector),
        Just(Region::Content),
    ]
}

fn arb_alert() -> impl Strategy<Value = Alert> {
    // Small message alphabet so identical lists recur often.
    (any::<bool>(), 0u8..3).prop_map(|(is_error, n)| {
        let severity = if is_error {
            Severity::Error
        } else {
            Severity::Warning
        };
        Alert::new(severity, format!("alert-{n}"))
    })
}

fn arb_msg() -> impl Strategy<Value = AlertMsg> {
    prop_oneof![
        3 => prop::collection::vec(arb_alert(), 0..4).prop_map(AlertMsg::AlertsChanged),
        2 => arb_region().prop_map(AlertMsg::PointerEnter),
        2 => arb_region().prop_map(AlertMsg::PointerLeave),
        1 => Just(AlertMsg::PointerDown(PointerTarget::Outside)),
        1 => Just(AlertMsg::PointerDown(PointerTarget::Inside)),
        1 => Just(AlertMsg::TriggerClicked),
        1 => (0usize..4).prop_map(AlertMsg::Dismiss),
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => arb_msg().prop_map(Op::Msg),
        2 => (0u64..4_000).prop_map(Op::Advance),
    ]
}

fn fresh() -> AlertDriver<VirtualClock> {
    AlertDriver::virtual_time(AlertController::default())
}

fn apply(driver: &mut AlertDriver<VirtualClock>, op: Op) {
    match op {
        Op::Msg(msg) => driver.dispatch(msg),
        Op::Advance(ms) => driver.advance_by(Duration::from_millis(ms)),
    }
}

fn assert_invariants(driver: &AlertDriver<VirtualClock>) {
    let ctl = driver.controller();
    assert!(
        driver.scheduler().outstanding() <= 1,
        "more than one close armed"
    );
    assert_eq!(
        driver.scheduler().outstanding(),
        usize::from(ctl.pending_close().is_some()),
        "scheduler and controller disagree about the pending close"
    );
    if !ctl.is_open() {
        assert!(!ctl.is_auto_shown(), "auto_shown while closed");
    }
    if ctl.alerts().is_empty() {
        assert!(!ctl.is_open(), "open with no alerts");
        assert!(ctl.view().is_none());
    }
    if ctl.is_open() {
        assert!(ctl.has_shown_initial());
    }
}

// ──────────────────── property tests ────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Any sequence of operations keeps at most one close timer armed.
    #[test]
    fn single_timer_invariant(ops in prop::collection::vec(arb_op(), 1..80)) {
        let mut driver = fresh();
        for op in ops {
            apply(&mut driver, op);
            assert_invariants(&driver);
        }
        prop_assert!(driver.scheduler().high_water() <= 1);
    }

    /// The first-show latch only ever goes from false to true.
    #[test]
    fn first_show_latch_is_monotonic(ops in prop::collection::vec(arb_op(), 1..60)) {
        let mut driver = fresh();
        let mut seen = false;
        for op in ops {
            apply(&mut driver, op);
            if seen {
                prop_assert!(driver.controller().has_shown_initial());
            }
            seen = driver.controller().has_shown_initial();
        }
    }

    /// Closing twice is the same as closing once.
    #[test]
    fn close_is_idempotent(ops in prop::collection::vec(arb_op(), 0..40)) {
        let mut driver = fresh();
        for op in ops {
            apply(&mut driver, op);
        }
        driver.dispatch(AlertMsg::PointerDown(PointerTarget::Outside));
        let once = driver.snapshot();
        driver.dispatch(AlertMsg::PointerDown(PointerTarget::Outside));
        prop_assert_eq!(once, driver.snapshot());
        prop_assert!(!once.open);
        prop_assert_eq!(driver.scheduler().outstanding(), 0);
    }

    /// While the pointer rests on the surface, no timer closes the popover.
    #[test]
    fn hover_precedes_timer(
        alerts in prop::collection::vec(arb_alert(), 1..4),
        region in arb_region(),
        wait in 0u64..60_000,
    ) {
        let mut driver = fresh();
        driver.dispatch(AlertMsg::AlertsChanged(alerts));
        driver.dispatch(AlertMsg::PointerEnter(region));
        driver.advance_by(Duration::from_millis(wait));
        prop_assert!(driver.controller().is_open());
        prop_assert_eq!(driver.controller().visibility(), Visibility::OpenManual);
    }

    /// Unmount leaves nothing armed and freezes the state.
    #[test]
    fn unmount_is_terminal(
        ops in prop::collection::vec(arb_op(), 0..40),
        after in prop::collection::vec(arb_op(), 0..20),
    ) {
        let mut driver = fresh();
        for op in ops {
            apply(&mut driver, op);
        }
        driver.dispatch(AlertMsg::Unmount);
        prop_assert_eq!(driver.scheduler().outstanding(), 0);
        let frozen = driver.snapshot();
        for op in after {
            apply(&mut driver, op);
        }
        prop_assert_eq!(frozen, driver.snapshot());
    }
}
