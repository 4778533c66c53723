//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use chat_alerts::prelude::*;
//! ```

// Core
pub use crate::core::config::Config;
pub use crate::core::errors::{AlertError, Result};

// Controller
pub use crate::alerts::controller::{
    AlertCmd, AlertController, AlertMsg, AlertSnapshot, AlertTimings, AlertView, Visibility,
};
pub use crate::alerts::model::{Alert, AlertAction, AlertIcon, Progress, Severity};
pub use crate::alerts::pointer::{PointerTarget, Region};
pub use crate::alerts::update::update;

// Execution
pub use crate::alerts::driver::{AlertDriver, Transition};
#[cfg(feature = "runtime")]
pub use crate::alerts::runtime::{AlertHandle, AlertRuntime, RuntimeConfig};
pub use crate::alerts::scenario::{ReplayReport, Scenario, replay};
pub use crate::alerts::timer::{CloseScheduler, TimerToken, VirtualClock};

// Journal
pub use crate::logger::jsonl::{JournalConfig, JournalWriter};
