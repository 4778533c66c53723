//! Alert records, severity resolution, and structural change detection.
//!
//! Alerts carry no persistent identifier. Two sequences are compared
//! position-by-position on `(severity, message)` only; actions and progress
//! bars never count as "new information".

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

// ──────────────────── severity ────────────────────

/// Alert severity. `Error` outranks `Warning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Degraded but usable (e.g. context window nearly full).
    Warning,
    /// Something failed and needs attention.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

// ──────────────────── action ────────────────────

/// User-invokable action attached to an alert (e.g. "Retry", "Compact now").
///
/// The callback is opaque to the controller. Cloning shares the callback.
#[derive(Clone)]
pub struct AlertAction {
    label: String,
    invoke: Arc<dyn Fn() + Send + Sync>,
}

impl AlertAction {
    /// Build an action from a label and a callback.
    pub fn new(label: impl Into<String>, invoke: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            label: label.into(),
            invoke: Arc::new(invoke),
        }
    }

    /// Button label shown next to the alert.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Run the callback.
    pub fn invoke(&self) {
        (self.invoke)();
    }
}

impl fmt::Debug for AlertAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlertAction")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

// ──────────────────── progress ────────────────────

/// Optional usage bar shown under an alert (tokens used / context limit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    /// Units consumed so far.
    pub current: u64,
    /// Capacity; zero means unknown.
    pub total: u64,
}

impl Progress {
    /// Filled fraction in `[0, 1]`. A zero total renders as empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.current as f64 / self.total as f64).clamp(0.0, 1.0)
    }
}

// ──────────────────── alert ────────────────────

/// A transient notification surfaced in the popover.
#[derive(Debug, Clone)]
pub struct Alert {
    /// Drives the trigger icon and change detection.
    pub severity: Severity,
    /// Human-readable text; part of the alert's identity.
    pub message: String,
    /// Optional button. Selecting it closes the popover.
    pub action: Option<AlertAction>,
    /// Optional usage bar. Display only.
    pub progress: Option<Progress>,
}

impl Alert {
    /// Alert with the given severity and message, no action, no progress.
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            action: None,
            progress: None,
        }
    }

    /// Shorthand for an `Error` alert.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    /// Shorthand for a `Warning` alert.
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Attach an action.
    #[must_use]
    pub fn with_action(
        mut self,
        label: impl Into<String>,
        invoke: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.action = Some(AlertAction::new(label, invoke));
        self
    }

    /// Attach a progress bar.
    #[must_use]
    pub fn with_progress(mut self, current: u64, total: u64) -> Self {
        self.progress = Some(Progress { current, total });
        self
    }

    /// Identity used for change detection.
    #[must_use]
    pub fn key(&self) -> AlertKey {
        AlertKey {
            severity: self.severity,
            message: self.message.clone(),
        }
    }
}

/// The `(severity, message)` pair an alert is compared on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct AlertKey {
    pub severity: Severity,
    pub message: String,
}

/// Snapshot a sequence for later diffing.
#[must_use]
pub fn snapshot(alerts: &[Alert]) -> Vec<AlertKey> {
    alerts.iter().map(Alert::key).collect()
}

/// Whether `next` carries new information relative to `previous`.
///
/// True when lengths differ or any position's severity or message differs.
/// Reordering counts as a change.
#[must_use]
pub fn structural_change(previous: &[AlertKey], next: &[Alert]) -> bool {
    previous.len() != next.len()
        || previous
            .iter()
            .zip(next)
            .any(|(old, new)| old.severity != new.severity || old.message != new.message)
}

// ──────────────────── icon ────────────────────

/// Trigger icon shown in the bottom menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum AlertIcon {
    Warning,
    Error,
}

impl AlertIcon {
    /// Highest severity wins: any `Error` anywhere selects the error icon.
    #[must_use]
    pub fn for_alerts(alerts: &[Alert]) -> Self {
        if alerts.iter().any(|a| a.severity == Severity::Error) {
            Self::Error
        } else {
            Self::Warning
        }
    }

    /// Semantic color token for the icon.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Error => "danger",
            Self::Warning => "warning",
        }
    }

    /// Short label for text output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }
}

impl fmt::Display for AlertIcon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
