//! Delayed-close scheduling primitives.
//!
//! The controller never touches a clock. It emits `ScheduleClose` /
//! `CancelClose` commands carrying a [`TimerToken`], and an executor maps them
//! onto a [`CloseScheduler`]. When a timer fires the executor feeds
//! `CloseTimerFired(token)` back; the controller ignores tokens it no longer
//! holds, so a fire racing a cancel is harmless.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Opaque handle identifying one scheduled close. Monotonic per controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerToken(pub(crate) u64);

impl TimerToken {
    /// Raw sequence number, for logs.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t#{}", self.0)
    }
}

/// Which rule armed a pending close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseKind {
    /// New or changed alerts were auto-shown.
    AutoHide,
    /// Pointer left the surface while the popover was manually open.
    HoverExit,
}

/// Executes delayed-close requests on some notion of time.
pub trait CloseScheduler {
    /// Arrange for `token` to be delivered back after `after`.
    fn schedule(&mut self, token: TimerToken, after: Duration);

    /// Drop a previously scheduled token. Unknown tokens are ignored.
    fn cancel(&mut self, token: TimerToken);

    /// Time since the scheduler started, used to stamp transitions.
    fn elapsed(&self) -> Duration;
}

// ──────────────────── virtual clock ────────────────────

/// Deterministic scheduler driven by explicit `advance` calls.
///
/// Used by scenario replay and tests. Counts outstanding timers so callers can
/// check that no event sequence ever leaves two closes armed.
#[derive(Debug, Default)]
pub struct VirtualClock {
    now: Duration,
    pending: BTreeSet<(Duration, TimerToken)>,
    high_water: usize,
    scheduled_total: u64,
    cancelled_total: u64,
    fired_total: u64,
}

impl VirtualClock {
    /// Fresh clock at t=0 with nothing scheduled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    #[must_use]
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Number of timers currently armed.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.pending.len()
    }

    /// Largest number of simultaneously armed timers ever observed.
    #[must_use]
    pub const fn high_water(&self) -> usize {
        self.high_water
    }

    /// Lifetime counters: `(scheduled, cancelled, fired)`.
    #[must_use]
    pub const fn totals(&self) -> (u64, u64, u64) {
        (self.scheduled_total, self.cancelled_total, self.fired_total)
    }

    /// Deadline of the earliest armed timer.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.first().map(|(deadline, _)| *deadline)
    }

    /// Remove and return the earliest timer due at or before `until`,
    /// moving the clock to its deadline.
    pub fn pop_due(&mut self, until: Duration) -> Option<(Duration, TimerToken)> {
        let &(deadline, token) = self.pending.first()?;
        if deadline > until {
            return None;
        }
        self.pending.pop_first();
        self.now = self.now.max(deadline);
        self.fired_total += 1;
        Some((deadline, token))
    }

    /// Move the clock forward without firing anything. Never moves backwards.
    pub fn set_now(&mut self, t: Duration) {
        self.now = self.now.max(t);
    }
}

impl CloseScheduler for VirtualClock {
    fn schedule(&mut self, token: TimerToken, after: Duration) {
        self.pending.insert((self.now + after, token));
        self.scheduled_total += 1;
        self.high_water = self.high_water.max(self.pending.len());
    }

    fn cancel(&mut self, token: TimerToken) {
        let before = self.pending.len();
        self.pending.retain(|(_, t)| *t != token);
        if self.pending.len() < before {
            self.cancelled_total += 1;
        }
    }

    fn elapsed(&self) -> Duration {
        self.now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timers_fire_in_deadline_order() {
        let mut clock = VirtualClock::new();
        clock.schedule(TimerToken(1), Duration::from_millis(300));
        clock.schedule(TimerToken(2), Duration::from_millis(100));
        assert_eq!(clock.high_water(), 2);

        let until = Duration::from_millis(1_000);
        assert_eq!(
            clock.pop_due(until),
            Some((Duration::from_millis(100), TimerToken(2)))
        );
        assert_eq!(clock.now(), Duration::from_millis(100));
        assert_eq!(
            clock.pop_due(until),
            Some((Duration::from_millis(300), TimerToken(1)))
        );
        assert_eq!(clock.pop_due(until), None);
        assert_eq!(clock.totals(), (2, 0, 2));
    }

    #[test]
    fn not_yet_due_timer_stays_armed() {
        let mut clock = VirtualClock::new();
        clock.schedule(TimerToken(7), Duration::from_millis(3_000));
        assert_eq!(clock.pop_due(Duration::from_millis(2_999)), None);
        assert_eq!(clock.outstanding(), 1);
        assert_eq!(clock.next_deadline(), Some(Duration::from_millis(3_000)));
    }

    #[test]
    fn cancel_suppresses_fire() {
        let mut clock = VirtualClock::new();
        clock.schedule(TimerToken(1), Duration::from_millis(10));
        clock.cancel(TimerToken(1));
        clock.cancel(TimerToken(99));
        assert_eq!(clock.pop_due(Duration::from_secs(60)), None);
        assert_eq!(clock.totals(), (1, 1, 0));
    }

    #[test]
    fn schedule_is_relative_to_now() {
        let mut clock = VirtualClock::new();
        clock.set_now(Duration::from_millis(500));
        clock.set_now(Duration::from_millis(200));
        assert_eq!(clock.now(), Duration::from_millis(500));
        clock.schedule(TimerToken(1), Duration::from_millis(1_000));
        assert_eq!(clock.next_deadline(), Some(Duration::from_millis(1_500)));
    }

    #[test]
    fn token_display() {
        assert_eq!(TimerToken(4).to_string(), "t#4");
        assert_eq!(TimerToken(4).get(), 4);
    }
}
