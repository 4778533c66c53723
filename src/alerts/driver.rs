//! Executes controller commands against a [`CloseScheduler`].
//!
//! The driver is the only place where the pure state machine meets time and
//! user callbacks. It keeps a transition log (for replay output and tests) and
//! mirrors transitions into an optional JSONL journal.

use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use serde::Serialize;

use super::controller::{AlertCmd, AlertController, AlertMsg, AlertSnapshot, Visibility};
use super::model::AlertIcon;
use super::timer::{CloseScheduler, VirtualClock};
use super::update::update;
use crate::logger::jsonl::{JournalEntry, JournalEvent, JournalWriter};

/// One visibility change, as observed by the driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    /// Scheduler time at which the change happened.
    pub at_ms: u64,
    /// Message kind that caused it.
    pub trigger: &'static str,
    pub from: Visibility,
    pub to: Visibility,
    pub icon: Option<AlertIcon>,
    pub alert_count: usize,
}

/// Controller plus the scheduler that executes its timers.
#[derive(Debug)]
pub struct AlertDriver<S: CloseScheduler> {
    controller: AlertController,
    scheduler: S,
    journal: Option<JournalWriter>,
    transitions: Vec<Transition>,
    actions_run: u64,
    actions_failed: u64,
}

impl<S: CloseScheduler> AlertDriver<S> {
    /// Wrap a freshly mounted controller.
    pub fn new(controller: AlertController, scheduler: S) -> Self {
        Self {
            controller,
            scheduler,
            journal: None,
            transitions: Vec::new(),
            actions_run: 0,
            actions_failed: 0,
        }
    }

    /// Mirror transitions into a journal.
    #[must_use]
    pub fn with_journal(mut self, journal: JournalWriter) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn controller(&self) -> &AlertController {
        &self.controller
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// Every visibility change so far, oldest first.
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Number of action callbacks executed.
    pub const fn actions_run(&self) -> u64 {
        self.actions_run
    }

    /// Number of action callbacks that panicked.
    pub const fn actions_failed(&self) -> u64 {
        self.actions_failed
    }

    pub fn snapshot(&self) -> AlertSnapshot {
        self.controller.snapshot()
    }

    /// Journal handle, if one is attached.
    pub fn journal_mut(&mut self) -> Option<&mut JournalWriter> {
        self.journal.as_mut()
    }

    /// Feed one message through `update()` and execute the resulting commands.
    pub fn dispatch(&mut self, msg: AlertMsg) {
        let trigger = msg.kind();
        let is_unmount = matches!(msg, AlertMsg::Unmount) && self.controller.is_mounted();
        let before = self.controller.visibility();

        let cmd = update(&mut self.controller, msg);
        self.execute(cmd, trigger);

        let after = self.controller.visibility();
        if before != after {
            self.record_transition(trigger, before, after);
        }
        if is_unmount {
            let mut entry = JournalEntry::new(JournalEvent::Unmounted);
            entry.at_ms = Some(millis(self.scheduler.elapsed()));
            self.journal(&entry);
        }
    }

    fn execute(&mut self, cmd: AlertCmd, trigger: &'static str) {
        for cmd in cmd.into_vec() {
            match cmd {
                AlertCmd::ScheduleClose { token, after, .. } => {
                    self.scheduler.schedule(token, after);
                }
                AlertCmd::CancelClose(token) => self.scheduler.cancel(token),
                AlertCmd::RunAction(action) => {
                    // A panicking callback must not take the controller down
                    // with it; the close has already been applied.
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| action.invoke()));
                    self.actions_run += 1;
                    let event = match outcome {
                        Ok(()) => JournalEvent::ActionInvoked,
                        Err(payload) => {
                            self.actions_failed += 1;
                            eprintln!(
                                "[CA-DRIVER] action {:?} panicked: {}",
                                action.label(),
                                panic_message(payload.as_ref())
                            );
                            JournalEvent::ActionFailed
                        }
                    };
                    let mut entry = JournalEntry::new(event);
                    entry.at_ms = Some(millis(self.scheduler.elapsed()));
                    entry.trigger = Some(trigger.to_string());
                    entry.details = Some(action.label().to_string());
                    self.journal(&entry);
                }
                AlertCmd::None | AlertCmd::Batch(_) => {}
            }
        }
    }

    fn record_transition(&mut self, trigger: &'static str, from: Visibility, to: Visibility) {
        let snap = self.controller.snapshot();
        let transition = Transition {
            at_ms: millis(self.scheduler.elapsed()),
            trigger,
            from,
            to,
            icon: snap.icon,
            alert_count: snap.alert_count,
        };

        let mut entry = JournalEntry::new(JournalEvent::Transition);
        entry.at_ms = Some(transition.at_ms);
        entry.trigger = Some(trigger.to_string());
        entry.from = Some(from);
        entry.to = Some(to);
        entry.icon = transition.icon;
        entry.alerts = Some(transition.alert_count);
        self.journal(&entry);

        self.transitions.push(transition);
    }

    fn journal(&mut self, entry: &JournalEntry) {
        if let Some(journal) = self.journal.as_mut() {
            journal.write_entry(entry);
        }
    }
}

impl AlertDriver<VirtualClock> {
    /// Driver on a fresh virtual clock.
    pub fn virtual_time(controller: AlertController) -> Self {
        Self::new(controller, VirtualClock::new())
    }

    /// Advance virtual time to `t`, firing every timer due on the way in
    /// deadline order.
    pub fn advance_to(&mut self, t: Duration) {
        while let Some((_, token)) = self.scheduler.pop_due(t) {
            self.dispatch(AlertMsg::CloseTimerFired(token));
        }
        self.scheduler.set_now(t);
    }

    /// Advance virtual time by `d`.
    pub fn advance_by(&mut self, d: Duration) {
        let target = self.scheduler.now() + d;
        self.advance_to(target);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[allow(clippy::cast_possible_truncation)]
pub(crate) const fn millis(d: Duration) -> u64 {
    d.as_millis() as u64
}
