//! CA-prefixed error types with structured error codes.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, AlertError>;

/// Top-level error type for the alert controller crate.
///
/// The controller itself never fails; these errors come from the ambient
/// layers around it (configuration, scenario replay, journal, runtime thread).
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("[CA-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[CA-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[CA-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[CA-2001] invalid scenario: {details}")]
    Scenario { details: String },

    #[error("[CA-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[CA-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[CA-3003] channel closed in component {component}")]
    ChannelClosed { component: &'static str },

    #[error("[CA-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl AlertError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "CA-1001",
            Self::MissingConfig { .. } => "CA-1002",
            Self::ConfigParse { .. } => "CA-1003",
            Self::Scenario { .. } => "CA-2001",
            Self::Serialization { .. } => "CA-2101",
            Self::Io { .. } => "CA-3002",
            Self::ChannelClosed { .. } => "CA-3003",
            Self::Runtime { .. } => "CA-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::ChannelClosed { .. } | Self::Runtime { .. }
        )
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Convenience constructor for scenario validation failures.
    #[must_use]
    pub fn scenario(details: impl Into<String>) -> Self {
        Self::Scenario {
            details: details.into(),
        }
    }
}

impl From<serde_json::Error> for AlertError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for AlertError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
