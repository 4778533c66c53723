//! Wall-clock runtime: a dedicated thread owns the controller and its timers.
//!
//! UI threads post [`AlertMsg`] values through a bounded crossbeam channel and
//! read the latest [`AlertSnapshot`] from a shared lock. The runtime thread
//! sleeps on `recv_timeout` until either a message arrives or the earliest
//! armed close comes due, so no separate timer thread exists.
//!
//! Messages are stamped when they are sent. A timer fires ahead of a message
//! only if its deadline is at or before that stamp, so a backlog on the
//! runtime thread never lets a timer overtake an earlier cancel.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use parking_lot::RwLock;

use super::controller::{AlertController, AlertMsg, AlertSnapshot, AlertTimings};
use super::driver::AlertDriver;
use super::timer::{CloseScheduler, TimerToken};
use crate::core::errors::{AlertError, Result};
use crate::logger::jsonl::{JournalConfig, JournalWriter};

/// Default bounded channel capacity for UI messages.
const CHANNEL_CAPACITY: usize = 256;

/// Poll interval used by [`AlertHandle::wait_until`].
const WAIT_POLL: Duration = Duration::from_millis(5);

// ──────────────────── deadline scheduler ────────────────────

/// [`CloseScheduler`] backed by `Instant` deadlines.
///
/// Deadlines are measured from the scheduler's current instant, which the
/// runtime moves forward to each event's timestamp.
#[derive(Debug)]
pub struct DeadlineScheduler {
    started: Instant,
    now: Instant,
    pending: BTreeSet<(Instant, TimerToken)>,
}

impl Default for DeadlineScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl DeadlineScheduler {
    #[must_use]
    pub fn new() -> Self {
        let started = Instant::now();
        Self {
            started,
            now: started,
            pending: BTreeSet::new(),
        }
    }

    /// Move the scheduler's clock forward. Earlier instants are ignored.
    pub fn set_now(&mut self, now: Instant) {
        self.now = self.now.max(now);
    }

    /// Earliest armed deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.first().map(|(deadline, _)| *deadline)
    }

    /// Number of armed timers.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.pending.len()
    }

    /// Remove the earliest timer whose deadline is at or before `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<(Instant, TimerToken)> {
        let &(deadline, token) = self.pending.first()?;
        if deadline > now {
            return None;
        }
        self.pending.pop_first();
        Some((deadline, token))
    }
}

impl CloseScheduler for DeadlineScheduler {
    fn schedule(&mut self, token: TimerToken, after: Duration) {
        self.pending.insert((self.now + after, token));
    }

    fn cancel(&mut self, token: TimerToken) {
        self.pending.retain(|(_, t)| *t != token);
    }

    fn elapsed(&self) -> Duration {
        self.now.duration_since(self.started)
    }
}

// ──────────────────── configuration ────────────────────

/// Options for spawning the runtime thread.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub timings: AlertTimings,
    /// Journal for transitions. `None` disables journaling.
    pub journal: Option<JournalConfig>,
    pub channel_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            timings: AlertTimings::default(),
            journal: None,
            channel_capacity: CHANNEL_CAPACITY,
        }
    }
}

// ──────────────────── handle ────────────────────

#[derive(Debug)]
enum RuntimeEvent {
    /// A UI message and the instant it was sent.
    Msg(AlertMsg, Instant),
    Shutdown,
}

/// Cheaply cloneable sender plus snapshot reader.
#[derive(Clone)]
pub struct AlertHandle {
    tx: Sender<RuntimeEvent>,
    snapshot: Arc<RwLock<AlertSnapshot>>,
}

impl std::fmt::Debug for AlertHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertHandle")
            .field("snapshot", &*self.snapshot.read())
            .finish_non_exhaustive()
    }
}

impl AlertHandle {
    /// Post a message to the runtime thread.
    ///
    /// Blocks while the channel is full; UI events are never dropped.
    pub fn send(&self, msg: AlertMsg) -> Result<()> {
        self.tx
            .send(RuntimeEvent::Msg(msg, Instant::now()))
            .map_err(|_| AlertError::ChannelClosed {
                component: "alert runtime",
            })
    }

    /// Latest state published by the runtime thread.
    #[must_use]
    pub fn snapshot(&self) -> AlertSnapshot {
        *self.snapshot.read()
    }

    /// Poll the published snapshot until `pred` holds or `timeout` passes.
    pub fn wait_until(&self, timeout: Duration, pred: impl Fn(&AlertSnapshot) -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if pred(&self.snapshot.read()) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(WAIT_POLL);
        }
    }
}

// ──────────────────── runtime ────────────────────

/// Owns the runtime thread. Dropping it unmounts the controller.
#[derive(Debug)]
pub struct AlertRuntime {
    handle: AlertHandle,
    join: Option<thread::JoinHandle<()>>,
}

impl AlertRuntime {
    /// Spawn the runtime thread with a freshly mounted controller.
    pub fn spawn(config: RuntimeConfig) -> Result<Self> {
        let (tx, rx) = bounded::<RuntimeEvent>(config.channel_capacity.max(1));
        let controller = AlertController::new(config.timings);
        let snapshot = Arc::new(RwLock::new(controller.snapshot()));
        let shared = Arc::clone(&snapshot);

        let mut driver = AlertDriver::new(controller, DeadlineScheduler::new());
        if let Some(journal) = config.journal {
            driver = driver.with_journal(JournalWriter::open(journal));
        }

        let join = thread::Builder::new()
            .name("chat-alerts".to_string())
            .spawn(move || runtime_thread_main(&rx, driver, &shared))
            .map_err(|e| AlertError::Runtime {
                details: format!("failed to spawn alert runtime thread: {e}"),
            })?;

        Ok(Self {
            handle: AlertHandle { tx, snapshot },
            join: Some(join),
        })
    }

    /// Handle for posting messages from other threads.
    #[must_use]
    pub fn handle(&self) -> AlertHandle {
        self.handle.clone()
    }

    /// Unmount the controller and wait for the thread to exit.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop()
    }

    fn stop(&mut self) -> Result<()> {
        let Some(join) = self.join.take() else {
            return Ok(());
        };
        // Disconnected means the thread is already gone.
        let _ = self.handle.tx.send(RuntimeEvent::Shutdown);
        join.join().map_err(|_| AlertError::Runtime {
            details: "alert runtime thread panicked".to_string(),
        })
    }
}

impl Drop for AlertRuntime {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn runtime_thread_main(
    rx: &Receiver<RuntimeEvent>,
    mut driver: AlertDriver<DeadlineScheduler>,
    shared: &RwLock<AlertSnapshot>,
) {
    loop {
        let event = match driver.scheduler().next_deadline() {
            Some(deadline) => {
                match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                    Ok(event) => Some(event),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            None => match rx.recv() {
                Ok(event) => Some(event),
                Err(_) => break,
            },
        };

        match event {
            Some(RuntimeEvent::Msg(msg, sent_at)) => {
                fire_due(&mut driver, sent_at);
                driver.dispatch(msg);
            }
            Some(RuntimeEvent::Shutdown) => break,
            None => fire_due(&mut driver, Instant::now()),
        }
        *shared.write() = driver.snapshot();
    }

    driver.dispatch(AlertMsg::Unmount);
    *shared.write() = driver.snapshot();
    if let Some(journal) = driver.journal_mut() {
        journal.flush();
    }
}

/// Fire every timer due at or before `now`, then move the clock to `now`.
fn fire_due(driver: &mut AlertDriver<DeadlineScheduler>, now: Instant) {
    while let Some((deadline, token)) = driver.scheduler_mut().pop_due(now) {
        driver.scheduler_mut().set_now(deadline);
        driver.dispatch(AlertMsg::CloseTimerFired(token));
    }
    driver.scheduler_mut().set_now(now);
}
