//! Elm-style state for the alert popover.
//!
//! All visibility state lives in [`AlertController`]. Data and pointer events
//! arrive as [`AlertMsg`] values; side-effects are represented as
//! [`AlertCmd`] values returned from [`super::update::update`].
//!
//! The controller is deterministic: no I/O and no clock access happen here.

#![allow(missing_docs)]

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::model::{Alert, AlertAction, AlertIcon, AlertKey};
use super::pointer::{PointerTarget, PointerTracker, Region};
use super::timer::{CloseKind, TimerToken};

/// Default delay before an auto-shown popover hides itself.
pub const DEFAULT_AUTO_CLOSE: Duration = Duration::from_millis(3_000);

/// Default delay before a manually opened popover hides after hover exit.
pub const DEFAULT_HOVER_EXIT_CLOSE: Duration = Duration::from_millis(1_000);

// ──────────────────── timings ────────────────────

/// Observable timing contract of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlertTimings {
    /// Hide delay after a first-time or changed alert set is auto-shown.
    pub auto_close: Duration,
    /// Hide delay after the pointer leaves a manually opened popover.
    pub hover_exit_close: Duration,
}

impl Default for AlertTimings {
    fn default() -> Self {
        Self {
            auto_close: DEFAULT_AUTO_CLOSE,
            hover_exit_close: DEFAULT_HOVER_EXIT_CLOSE,
        }
    }
}

impl AlertTimings {
    /// Build from millisecond values.
    #[must_use]
    pub const fn from_millis(auto_close_ms: u64, hover_exit_close_ms: u64) -> Self {
        Self {
            auto_close: Duration::from_millis(auto_close_ms),
            hover_exit_close: Duration::from_millis(hover_exit_close_ms),
        }
    }
}

// ──────────────────── visibility ────────────────────

/// Popover visibility. `OpenAuto` is the only state where `autoShown` holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Nothing shown.
    #[default]
    Closed,
    /// Opened by the controller because of new or changed alerts.
    OpenAuto,
    /// Opened (or kept open) by user interaction.
    OpenManual,
}

impl Visibility {
    /// Whether content is visible.
    #[must_use]
    pub const fn is_open(self) -> bool {
        !matches!(self, Self::Closed)
    }

    /// Whether the current open state was system-initiated.
    #[must_use]
    pub const fn is_auto_shown(self) -> bool {
        matches!(self, Self::OpenAuto)
    }

    /// Short label for logs and replay output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::OpenAuto => "open (auto)",
            Self::OpenManual => "open (manual)",
        }
    }
}

/// The single armed delayed close, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PendingClose {
    pub token: TimerToken,
    pub after: Duration,
    pub kind: CloseKind,
}

// ──────────────────── controller ────────────────────

/// Complete state for one mounted alert popover.
///
/// Fields are private so that every mutation goes through the update
/// function, which is what keeps the one-pending-close rule checkable.
#[derive(Debug)]
pub struct AlertController {
    pub(super) timings: AlertTimings,
    pub(super) visibility: Visibility,
    /// Latches true the first time alerts are surfaced.
    pub(super) has_shown_initial: bool,
    pub(super) pointer: PointerTracker,
    /// Snapshot of the last sequence, replaced on every alert update.
    pub(super) previous_alerts: Vec<AlertKey>,
    pub(super) alerts: Vec<Alert>,
    pub(super) pending_close: Option<PendingClose>,
    pub(super) next_token: u64,
    pub(super) mounted: bool,
}

impl Default for AlertController {
    fn default() -> Self {
        Self::new(AlertTimings::default())
    }
}

impl AlertController {
    /// Mount a controller: no alerts, closed, nothing scheduled.
    #[must_use]
    pub fn new(timings: AlertTimings) -> Self {
        Self {
            timings,
            visibility: Visibility::Closed,
            has_shown_initial: false,
            pointer: PointerTracker::default(),
            previous_alerts: Vec::new(),
            alerts: Vec::new(),
            pending_close: None,
            next_token: 0,
            mounted: true,
        }
    }

    #[must_use]
    pub const fn timings(&self) -> AlertTimings {
        self.timings
    }

    #[must_use]
    pub const fn visibility(&self) -> Visibility {
        self.visibility
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.visibility.is_open()
    }

    #[must_use]
    pub const fn is_auto_shown(&self) -> bool {
        self.visibility.is_auto_shown()
    }

    #[must_use]
    pub const fn has_shown_initial(&self) -> bool {
        self.has_shown_initial
    }

    #[must_use]
    pub const fn hovered(&self) -> bool {
        self.pointer.hovered()
    }

    #[must_use]
    pub const fn pending_close(&self) -> Option<PendingClose> {
        self.pending_close
    }

    #[must_use]
    pub const fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Current alert sequence in display order.
    #[must_use]
    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    /// Trigger icon for the current sequence.
    #[must_use]
    pub fn icon(&self) -> AlertIcon {
        AlertIcon::for_alerts(&self.alerts)
    }

    /// Render input. `None` means the popover renders nothing at all.
    #[must_use]
    pub fn view(&self) -> Option<AlertView<'_>> {
        if self.alerts.is_empty() || !self.mounted {
            return None;
        }
        Some(AlertView {
            open: self.is_open(),
            auto_shown: self.is_auto_shown(),
            icon: self.icon(),
            alerts: &self.alerts,
        })
    }

    /// Owned summary for publication across threads and journaling.
    #[must_use]
    pub fn snapshot(&self) -> AlertSnapshot {
        AlertSnapshot {
            visibility: self.visibility,
            open: self.is_open(),
            icon: (!self.alerts.is_empty()).then(|| self.icon()),
            alert_count: self.alerts.len(),
            hovered: self.hovered(),
            pending_close: self.pending_close,
            mounted: self.mounted,
        }
    }

    pub(super) fn issue_token(&mut self) -> TimerToken {
        let token = TimerToken(self.next_token);
        self.next_token += 1;
        token
    }
}

// ──────────────────── view ────────────────────

/// What the rendering layer needs to draw the trigger and popover.
#[derive(Debug, Clone, Copy)]
pub struct AlertView<'a> {
    pub open: bool,
    pub auto_shown: bool,
    pub icon: AlertIcon,
    pub alerts: &'a [Alert],
}

/// Thread-safe copy of the observable controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AlertSnapshot {
    pub visibility: Visibility,
    pub open: bool,
    pub icon: Option<AlertIcon>,
    pub alert_count: usize,
    pub hovered: bool,
    pub pending_close: Option<PendingClose>,
    pub mounted: bool,
}

// ──────────────────── messages ────────────────────

/// Events that drive state transitions in the controller.
#[derive(Debug, Clone)]
pub enum AlertMsg {
    /// The producer delivered a new alert sequence (possibly identical).
    AlertsChanged(Vec<Alert>),
    /// Pointer entered one region of the surface.
    PointerEnter(Region),
    /// Pointer left one region of the surface.
    PointerLeave(Region),
    /// Global pointer-down, classified against the surface bounds.
    PointerDown(PointerTarget),
    /// User clicked the trigger icon (`onToggle`).
    TriggerClicked,
    /// User selected the alert at this index (`onDismissAlert`).
    Dismiss(usize),
    /// A delayed close armed with this token came due.
    CloseTimerFired(TimerToken),
    /// The popover is being torn down.
    Unmount,
}

impl AlertMsg {
    /// Stable short name, for journaling.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::AlertsChanged(_) => "alerts_changed",
            Self::PointerEnter(_) => "pointer_enter",
            Self::PointerLeave(_) => "pointer_leave",
            Self::PointerDown(_) => "pointer_down",
            Self::TriggerClicked => "trigger_clicked",
            Self::Dismiss(_) => "dismiss",
            Self::CloseTimerFired(_) => "close_timer_fired",
            Self::Unmount => "unmount",
        }
    }
}

// ──────────────────── commands ────────────────────

/// Side-effects returned by the update function for an executor to perform.
///
/// Within a batch, a `CancelClose` always precedes the `ScheduleClose` that
/// replaces it.
#[derive(Debug, Clone)]
pub enum AlertCmd {
    /// No side-effect.
    None,
    /// Deliver `CloseTimerFired(token)` after `after`.
    ScheduleClose {
        token: TimerToken,
        after: Duration,
        kind: CloseKind,
    },
    /// Drop the armed close for `token`.
    CancelClose(TimerToken),
    /// Invoke an alert's action callback.
    RunAction(AlertAction),
    /// Execute multiple commands in order.
    Batch(Vec<Self>),
}

impl AlertCmd {
    /// Collapse a command list: empty → `None`, single → itself.
    #[must_use]
    pub fn from_vec(mut cmds: Vec<Self>) -> Self {
        match cmds.len() {
            0 => Self::None,
            1 => cmds.pop().unwrap_or(Self::None),
            _ => Self::Batch(cmds),
        }
    }

    /// Flatten nested batches into execution order, dropping `None`.
    #[must_use]
    pub fn into_vec(self) -> Vec<Self> {
        match self {
            Self::None => Vec::new(),
            Self::Batch(cmds) => cmds.into_iter().flat_map(Self::into_vec).collect(),
            other => vec![other],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_controller_is_closed_and_empty() {
        let ctl = AlertController::default();
        assert_eq!(ctl.visibility(), Visibility::Closed);
        assert!(!ctl.is_open());
        assert!(!ctl.is_auto_shown());
        assert!(!ctl.has_shown_initial());
        assert!(ctl.pending_close().is_none());
        assert!(ctl.is_mounted());
        assert!(ctl.view().is_none());
        assert_eq!(ctl.timings(), AlertTimings::from_millis(3_000, 1_000));
    }

    #[test]
    fn visibility_flags() {
        assert!(!Visibility::Closed.is_open());
        assert!(Visibility::OpenAuto.is_open());
        assert!(Visibility::OpenAuto.is_auto_shown());
        assert!(Visibility::OpenManual.is_open());
        assert!(!Visibility::OpenManual.is_auto_shown());
    }

    #[test]
    fn tokens_are_monotonic() {
        let mut ctl = AlertController::default();
        let a = ctl.issue_token();
        let b = ctl.issue_token();
        assert!(b > a);
    }

    #[test]
    fn snapshot_has_no_icon_without_alerts() {
        let ctl = AlertController::default();
        let snap = ctl.snapshot();
        assert_eq!(snap.icon, None);
        assert_eq!(snap.alert_count, 0);
        assert!(!snap.open);
    }

    #[test]
    fn cmd_from_vec_collapses() {
        assert!(matches!(AlertCmd::from_vec(vec![]), AlertCmd::None));
        assert!(matches!(
            AlertCmd::from_vec(vec![AlertCmd::CancelClose(TimerToken(1))]),
            AlertCmd::CancelClose(_)
        ));
        let batch = AlertCmd::from_vec(vec![
            AlertCmd::CancelClose(TimerToken(1)),
            AlertCmd::CancelClose(TimerToken(2)),
        ]);
        assert_eq!(batch.into_vec().len(), 2);
    }

    #[test]
    fn cmd_into_vec_flattens_nested_batches() {
        let nested = AlertCmd::Batch(vec![
            AlertCmd::None,
            AlertCmd::Batch(vec![AlertCmd::CancelClose(TimerToken(3))]),
            AlertCmd::ScheduleClose {
                token: TimerToken(4),
                after: DEFAULT_AUTO_CLOSE,
                kind: CloseKind::AutoHide,
            },
        ]);
        let flat = nested.into_vec();
        assert_eq!(flat.len(), 2);
        assert!(matches!(flat[0], AlertCmd::CancelClose(TimerToken(3))));
    }

    #[test]
    fn msg_kind_names_are_stable() {
        assert_eq!(AlertMsg::TriggerClicked.kind(), "trigger_clicked");
        assert_eq!(AlertMsg::AlertsChanged(vec![]).kind(), "alerts_changed");
    }
}
