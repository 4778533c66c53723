//! Pure update function for the alert popover.
//!
//! `update()` takes the controller and a message, mutates the controller, and
//! returns a command describing any side-effects the executor should perform.
//!
//! **Design invariant:** this module performs zero I/O. Every path that arms a
//! close goes through [`arm_close`], which cancels the previous one first, so
//! at most one close is ever pending.

use super::controller::{AlertCmd, AlertController, AlertMsg, PendingClose, Visibility};
use super::model::{self, Alert};
use super::pointer::{HoverEdge, PointerTarget};
use super::timer::{CloseKind, TimerToken};

/// Apply a message to the controller and return the command for the executor.
///
/// Messages delivered after `Unmount` are ignored.
pub fn update(ctl: &mut AlertController, msg: AlertMsg) -> AlertCmd {
    if !ctl.mounted {
        return AlertCmd::None;
    }

    let mut cmds = Vec::new();
    match msg {
        AlertMsg::AlertsChanged(alerts) => on_alerts_changed(ctl, alerts, &mut cmds),

        AlertMsg::PointerEnter(region) => {
            ctl.pointer.enter(region);
            claim_hover(ctl, &mut cmds);
        }

        AlertMsg::PointerLeave(region) => {
            let edge = ctl.pointer.leave(region);
            // Auto-shown popovers keep their own timer; only a manual open
            // re-arms the shorter hover-exit close.
            if edge == HoverEdge::Exited && ctl.visibility == Visibility::OpenManual {
                let after = ctl.timings.hover_exit_close;
                arm_close(ctl, CloseKind::HoverExit, after, &mut cmds);
            }
        }

        AlertMsg::PointerDown(PointerTarget::Outside) => {
            if ctl.visibility.is_open() {
                close(ctl, &mut cmds);
            }
        }

        AlertMsg::PointerDown(PointerTarget::Inside) => {}

        AlertMsg::TriggerClicked => match ctl.visibility {
            Visibility::OpenManual => close(ctl, &mut cmds),
            Visibility::Closed | Visibility::OpenAuto => open_manual(ctl, &mut cmds),
        },

        AlertMsg::Dismiss(index) => {
            if let Some(alert) = ctl.alerts.get(index) {
                // Close first: the callback runs after the state has settled.
                let action = alert.action.clone();
                close(ctl, &mut cmds);
                cmds.extend(action.map(AlertCmd::RunAction));
            }
        }

        AlertMsg::CloseTimerFired(token) => on_timer_fired(ctl, token),

        AlertMsg::Unmount => {
            cancel_pending(ctl, &mut cmds);
            ctl.visibility = Visibility::Closed;
            ctl.pointer.reset();
            ctl.mounted = false;
        }
    }

    AlertCmd::from_vec(cmds)
}

fn on_alerts_changed(ctl: &mut AlertController, alerts: Vec<Alert>, cmds: &mut Vec<AlertCmd>) {
    let changed = model::structural_change(&ctl.previous_alerts, &alerts);
    ctl.previous_alerts = model::snapshot(&alerts);
    ctl.alerts = alerts;

    if ctl.alerts.is_empty() {
        close(ctl, cmds);
        return;
    }

    if ctl.has_shown_initial && !changed {
        return;
    }

    // First surface, or new information while open or closed: (re)show as
    // auto and restart the long timer.
    ctl.has_shown_initial = true;
    ctl.visibility = Visibility::OpenAuto;
    let after = ctl.timings.auto_close;
    arm_close(ctl, CloseKind::AutoHide, after, cmds);

    // Pointer already resting on the surface: hover wins over auto-hide.
    if ctl.pointer.hovered() {
        claim_hover(ctl, cmds);
    }
}

fn on_timer_fired(ctl: &mut AlertController, token: TimerToken) {
    match ctl.pending_close {
        Some(pending) if pending.token == token => {
            // The timer already ran; nothing left to cancel.
            ctl.pending_close = None;
            ctl.visibility = Visibility::Closed;
        }
        // Stale or superseded token, or already closed.
        _ => {}
    }
}

/// Pointer is on the surface: cancel any pending close and hold the popover
/// open as user-owned.
fn claim_hover(ctl: &mut AlertController, cmds: &mut Vec<AlertCmd>) {
    cancel_pending(ctl, cmds);
    if !ctl.alerts.is_empty() {
        ctl.visibility = Visibility::OpenManual;
    }
}

fn open_manual(ctl: &mut AlertController, cmds: &mut Vec<AlertCmd>) {
    if ctl.alerts.is_empty() {
        return;
    }
    cancel_pending(ctl, cmds);
    ctl.visibility = Visibility::OpenManual;
}

fn close(ctl: &mut AlertController, cmds: &mut Vec<AlertCmd>) {
    cancel_pending(ctl, cmds);
    ctl.visibility = Visibility::Closed;
}

fn cancel_pending(ctl: &mut AlertController, cmds: &mut Vec<AlertCmd>) {
    if let Some(pending) = ctl.pending_close.take() {
        cmds.push(AlertCmd::CancelClose(pending.token));
    }
}

fn arm_close(
    ctl: &mut AlertController,
    kind: CloseKind,
    after: std::time::Duration,
    cmds: &mut Vec<AlertCmd>,
) {
    cancel_pending(ctl, cmds);
    let token = ctl.issue_token();
    ctl.pending_close = Some(PendingClose { token, after, kind });
    cmds.push(AlertCmd::ScheduleClose { token, after, kind });
}

// ──────────────────── tests ────────────────────
