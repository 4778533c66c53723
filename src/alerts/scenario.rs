//! Scripted replay of alert scenarios on a virtual clock.
//!
//! A scenario is a TOML file listing timed steps (alert updates, pointer
//! events, clicks) and expectations about the popover at given instants.
//! Replay is fully deterministic: timers due at or before an instant fire
//! first, then the steps at that instant run in file order, then the
//! expectations for that instant are checked.

#![allow(missing_docs)]

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::controller::{AlertController, AlertMsg, AlertSnapshot, AlertTimings};
use super::driver::{AlertDriver, Transition, millis};
use super::model::{Alert, AlertIcon, Progress, Severity};
use super::pointer::{PointerTarget, Region};
use super::timer::VirtualClock;
use crate::core::config::MAX_CLOSE_DELAY_MS;
use crate::core::errors::{AlertError, Result};
use crate::logger::jsonl::{JournalEntry, JournalEvent, JournalWriter};

// ──────────────────── file format ────────────────────

/// One alert as written in a scenario file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AlertSpec {
    pub severity: Severity,
    pub message: String,
    /// Action button label. Invocations are recorded in the report.
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub progress: Option<Progress>,
}

/// Timing overrides carried by a scenario.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioTimings {
    #[serde(default)]
    pub auto_close_ms: Option<u64>,
    #[serde(default)]
    pub hover_exit_close_ms: Option<u64>,
}

impl ScenarioTimings {
    /// Overlay these overrides on `base`.
    #[must_use]
    pub fn apply(self, base: AlertTimings) -> AlertTimings {
        AlertTimings {
            auto_close: self
                .auto_close_ms
                .map_or(base.auto_close, Duration::from_millis),
            hover_exit_close: self
                .hover_exit_close_ms
                .map_or(base.hover_exit_close, Duration::from_millis),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStep {
    at_ms: u64,
    #[serde(default)]
    alerts: Option<Vec<AlertSpec>>,
    #[serde(default)]
    pointer_enter: Option<Region>,
    #[serde(default)]
    pointer_leave: Option<Region>,
    #[serde(default)]
    pointer_down: Option<PointerTarget>,
    #[serde(default)]
    click: Option<bool>,
    #[serde(default)]
    dismiss: Option<usize>,
    #[serde(default)]
    unmount: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawScenario {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    timings: Option<ScenarioTimings>,
    #[serde(default)]
    until_ms: Option<u64>,
    #[serde(default, rename = "step")]
    steps: Vec<RawStep>,
    #[serde(default, rename = "expect")]
    expectations: Vec<Expectation>,
}

/// The single event a step performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepEvent {
    Alerts(Vec<AlertSpec>),
    PointerEnter(Region),
    PointerLeave(Region),
    PointerDown(PointerTarget),
    Click,
    Dismiss(usize),
    Unmount,
}

/// A timed event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub at_ms: u64,
    pub event: StepEvent,
}

/// Assertions about the popover at one instant. Unset fields are not checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Expectation {
    pub at_ms: u64,
    #[serde(default)]
    pub open: Option<bool>,
    #[serde(default)]
    pub auto_shown: Option<bool>,
    #[serde(default)]
    pub icon: Option<AlertIcon>,
    #[serde(default)]
    pub hovered: Option<bool>,
}

impl Expectation {
    const fn is_empty(&self) -> bool {
        self.open.is_none()
            && self.auto_shown.is_none()
            && self.icon.is_none()
            && self.hovered.is_none()
    }
}

/// Parsed, validated scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,
    pub timings: ScenarioTimings,
    pub until_ms: Option<u64>,
    pub steps: Vec<Step>,
    pub expectations: Vec<Expectation>,
}

impl Scenario {
    /// Parse and validate scenario TOML. `name` is used when the file has none.
    pub fn from_toml_str(text: &str, name: &str) -> Result<Self> {
        let raw: RawScenario = toml::from_str(text)
            .map_err(|e| AlertError::scenario(format!("invalid scenario TOML: {e}")))?;

        let mut steps = Vec::with_capacity(raw.steps.len());
        let mut last_at = 0;
        for (idx, step) in raw.steps.into_iter().enumerate() {
            if step.at_ms < last_at {
                return Err(AlertError::scenario(format!(
                    "step {idx} at {}ms precedes previous step at {last_at}ms",
                    step.at_ms
                )));
            }
            last_at = step.at_ms;
            steps.push(Step {
                at_ms: step.at_ms,
                event: step_event(idx, step)?,
            });
        }

        let mut expectations = raw.expectations;
        if let Some(idx) = expectations.iter().position(Expectation::is_empty) {
            return Err(AlertError::scenario(format!(
                "expectation {idx} checks nothing"
            )));
        }
        expectations.sort_by_key(|e| e.at_ms);

        let timings = raw.timings.unwrap_or_default();
        for (field, value) in [
            ("auto_close_ms", timings.auto_close_ms),
            ("hover_exit_close_ms", timings.hover_exit_close_ms),
        ] {
            if let Some(ms) = value.filter(|ms| *ms == 0 || *ms > MAX_CLOSE_DELAY_MS) {
                return Err(AlertError::scenario(format!(
                    "timings.{field} must be in [1, {MAX_CLOSE_DELAY_MS}], got {ms}"
                )));
            }
        }

        let scenario = Self {
            name: raw.name.unwrap_or_else(|| name.to_string()),
            timings,
            until_ms: raw.until_ms,
            steps,
            expectations,
        };
        if let Some(until) = scenario.until_ms
            && until < scenario.last_instant()
        {
            return Err(AlertError::scenario(format!(
                "until_ms {until} precedes the last step or expectation"
            )));
        }
        Ok(scenario)
    }

    /// Read and parse a scenario file. The file stem names the scenario.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| AlertError::io(path, e))?;
        let stem = path
            .file_stem()
            .map_or_else(|| "scenario".to_string(), |s| s.to_string_lossy().into_owned());
        Self::from_toml_str(&text, &stem)
    }

    fn last_instant(&self) -> u64 {
        let last_step = self.steps.last().map_or(0, |s| s.at_ms);
        let last_expect = self.expectations.last().map_or(0, |e| e.at_ms);
        last_step.max(last_expect)
    }
}

fn step_event(idx: usize, step: RawStep) -> Result<StepEvent> {
    let mut events = Vec::new();
    if let Some(alerts) = step.alerts {
        events.push(StepEvent::Alerts(alerts));
    }
    if let Some(region) = step.pointer_enter {
        events.push(StepEvent::PointerEnter(region));
    }
    if let Some(region) = step.pointer_leave {
        events.push(StepEvent::PointerLeave(region));
    }
    if let Some(target) = step.pointer_down {
        events.push(StepEvent::PointerDown(target));
    }
    if step.click == Some(true) {
        events.push(StepEvent::Click);
    }
    if let Some(index) = step.dismiss {
        events.push(StepEvent::Dismiss(index));
    }
    if step.unmount == Some(true) {
        events.push(StepEvent::Unmount);
    }

    if events.len() != 1 {
        return Err(AlertError::scenario(format!(
            "step {idx} must contain exactly one event, found {}",
            events.len()
        )));
    }
    Ok(events.remove(0))
}

// ──────────────────── replay ────────────────────

/// One action callback that ran during replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionRecord {
    pub at_ms: u64,
    pub label: String,
}

#[derive(Debug, Default)]
struct ActionLog {
    now_ms: u64,
    records: Vec<ActionRecord>,
}

/// An expectation that did not hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpectationFailure {
    pub at_ms: u64,
    pub field: &'static str,
    pub expected: String,
    pub actual: String,
}

/// Outcome of replaying a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub name: String,
    pub auto_close_ms: u64,
    pub hover_exit_close_ms: u64,
    pub transitions: Vec<Transition>,
    pub actions: Vec<ActionRecord>,
    pub failures: Vec<ExpectationFailure>,
    pub expectations_checked: usize,
    /// Expectations with at least one failing field.
    pub expectations_failed: usize,
    /// Highest number of simultaneously armed close timers.
    pub max_outstanding_timers: usize,
    pub final_at_ms: u64,
    pub final_state: AlertSnapshot,
    /// SHA-256 over the transition log; identical runs produce identical digests.
    pub digest: String,
}

impl ReplayReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Replay `scenario` on a virtual clock.
///
/// Scenario timings override `base`. Without `until_ms`, replay continues
/// past the last instant until no close timer remains armed.
pub fn replay(
    scenario: &Scenario,
    base: AlertTimings,
    journal: Option<JournalWriter>,
) -> Result<ReplayReport> {
    let timings = scenario.timings.apply(base);
    let mut driver = AlertDriver::virtual_time(AlertController::new(timings));
    if let Some(journal) = journal {
        driver = driver.with_journal(journal);
    }
    let log = Arc::new(Mutex::new(ActionLog::default()));

    journal_marker(&mut driver, JournalEvent::ReplayStarted, &scenario.name);

    let instants: BTreeSet<u64> = scenario
        .steps
        .iter()
        .map(|s| s.at_ms)
        .chain(scenario.expectations.iter().map(|e| e.at_ms))
        .collect();

    let mut steps = scenario.steps.iter().peekable();
    let mut expectations = scenario.expectations.iter().peekable();
    let mut failures = Vec::new();
    let mut checked = 0;
    let mut failed = 0;

    for at_ms in instants {
        driver.advance_to(Duration::from_millis(at_ms));
        log.lock().now_ms = at_ms;
        while let Some(step) = steps.next_if(|s| s.at_ms == at_ms) {
            driver.dispatch(step_message(&step.event, &log));
        }
        let snap = driver.snapshot();
        let auto_shown = driver.controller().is_auto_shown();
        while let Some(expect) = expectations.next_if(|e| e.at_ms == at_ms) {
            checked += 1;
            let before = failures.len();
            check(expect, &snap, auto_shown, &mut failures);
            if failures.len() > before {
                failed += 1;
            }
        }
    }

    match scenario.until_ms {
        Some(until) => driver.advance_to(Duration::from_millis(until)),
        None => {
            while let Some(deadline) = driver.scheduler().next_deadline() {
                driver.advance_to(deadline);
            }
        }
    }

    let transitions = driver.transitions().to_vec();
    let digest = digest(&transitions);
    journal_marker(&mut driver, JournalEvent::ReplayFinished, &digest);
    if let Some(journal) = driver.journal_mut() {
        journal.flush();
    }

    let actions = std::mem::take(&mut log.lock().records);
    Ok(ReplayReport {
        name: scenario.name.clone(),
        auto_close_ms: millis(timings.auto_close),
        hover_exit_close_ms: millis(timings.hover_exit_close),
        transitions,
        actions,
        failures,
        expectations_checked: checked,
        expectations_failed: failed,
        max_outstanding_timers: driver.scheduler().high_water(),
        final_at_ms: millis(driver.scheduler().now()),
        final_state: driver.snapshot(),
        digest,
    })
}

fn step_message(event: &StepEvent, log: &Arc<Mutex<ActionLog>>) -> AlertMsg {
    match event {
        StepEvent::Alerts(specs) => AlertMsg::AlertsChanged(
            specs
                .iter()
                .map(|spec| build_alert(spec, log))
                .collect(),
        ),
        StepEvent::PointerEnter(region) => AlertMsg::PointerEnter(*region),
        StepEvent::PointerLeave(region) => AlertMsg::PointerLeave(*region),
        StepEvent::PointerDown(target) => AlertMsg::PointerDown(*target),
        StepEvent::Click => AlertMsg::TriggerClicked,
        StepEvent::Dismiss(index) => AlertMsg::Dismiss(*index),
        StepEvent::Unmount => AlertMsg::Unmount,
    }
}

fn build_alert(spec: &AlertSpec, log: &Arc<Mutex<ActionLog>>) -> Alert {
    let mut alert = Alert::new(spec.severity, spec.message.clone());
    alert.progress = spec.progress;
    if let Some(label) = &spec.action {
        let sink = Arc::clone(log);
        let recorded = label.clone();
        alert = alert.with_action(label.clone(), move || {
            let mut log = sink.lock();
            let at_ms = log.now_ms;
            log.records.push(ActionRecord {
                at_ms,
                label: recorded.clone(),
            });
        });
    }
    alert
}

fn check(
    expect: &Expectation,
    snap: &AlertSnapshot,
    auto_shown: bool,
    failures: &mut Vec<ExpectationFailure>,
) {
    let mut compare = |field: &'static str, expected: Option<String>, actual: String| {
        if let Some(expected) = expected
            && expected != actual
        {
            failures.push(ExpectationFailure {
                at_ms: expect.at_ms,
                field,
                expected,
                actual,
            });
        }
    };
    compare("open", expect.open.map(|b| b.to_string()), snap.open.to_string());
    compare(
        "auto_shown",
        expect.auto_shown.map(|b| b.to_string()),
        auto_shown.to_string(),
    );
    compare(
        "icon",
        expect.icon.map(|i| i.label().to_string()),
        snap.icon.map_or_else(|| "none".to_string(), |i| i.label().to_string()),
    );
    compare(
        "hovered",
        expect.hovered.map(|b| b.to_string()),
        snap.hovered.to_string(),
    );
}

fn journal_marker(
    driver: &mut AlertDriver<VirtualClock>,
    event: JournalEvent,
    details: &str,
) {
    let at_ms = millis(driver.scheduler().now());
    if let Some(journal) = driver.journal_mut() {
        let mut entry = JournalEntry::new(event);
        entry.at_ms = Some(at_ms);
        entry.details = Some(details.to_string());
        journal.write_entry(&entry);
    }
}

fn digest(transitions: &[Transition]) -> String {
    let mut hasher = Sha256::new();
    for t in transitions {
        let mut line = String::new();
        let _ = writeln!(
            line,
            "{}|{}|{}|{}|{:?}|{}",
            t.at_ms,
            t.trigger,
            t.from.label(),
            t.to.label(),
            t.icon,
            t.alert_count
        );
        hasher.update(line.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
