//! Configuration system: TOML file + env var overrides + defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::alerts::controller::AlertTimings;
use crate::core::errors::{AlertError, Result};
use crate::logger::jsonl::JournalConfig;

/// Upper bound for either close delay.
pub const MAX_CLOSE_DELAY_MS: u64 = 600_000;

/// Full configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub timings: TimingsConfig,
    pub journal: JournalSettings,
    pub paths: PathsConfig,
}

/// Popover close delays.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimingsConfig {
    /// Hide delay after alerts are auto-shown.
    pub auto_close_ms: u64,
    /// Hide delay after the pointer leaves a manually opened popover.
    pub hover_exit_close_ms: u64,
}

/// Transition journal settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct JournalSettings {
    pub enabled: bool,
    pub path: PathBuf,
    pub fallback_path: Option<PathBuf>,
    pub max_size_bytes: u64,
    pub max_rotated_files: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
}

impl Default for TimingsConfig {
    fn default() -> Self {
        Self {
            auto_close_ms: 3_000,
            hover_exit_close_ms: 1_000,
        }
    }
}

impl Default for JournalSettings {
    fn default() -> Self {
        let journal = JournalConfig::default();
        Self {
            enabled: false,
            path: journal.path,
            fallback_path: journal.fallback_path,
            max_size_bytes: journal.max_size_bytes,
            max_rotated_files: journal.max_rotated_files,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!("[CA-CONFIG] WARNING: HOME not set, falling back to /tmp for config path");
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        Self {
            config_file: home_dir
                .join(".config")
                .join("chat-alerts")
                .join("config.toml"),
        }
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, env_var)
    }

    /// [`Config::load`] with an injectable environment lookup.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|e| AlertError::io(&path_buf, e))?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(AlertError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(lookup)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a over the canonical JSON form, stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// Controller timings derived from this config.
    #[must_use]
    pub const fn alert_timings(&self) -> AlertTimings {
        AlertTimings::from_millis(self.timings.auto_close_ms, self.timings.hover_exit_close_ms)
    }

    /// Journal writer config, or `None` when journaling is disabled.
    #[must_use]
    pub fn journal_config(&self) -> Option<JournalConfig> {
        self.journal.enabled.then(|| JournalConfig {
            path: self.journal.path.clone(),
            fallback_path: self.journal.fallback_path.clone(),
            max_size_bytes: self.journal.max_size_bytes,
            max_rotated_files: self.journal.max_rotated_files,
        })
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        if let Some(raw) = lookup("CHAT_ALERTS_AUTO_CLOSE_MS") {
            self.timings.auto_close_ms = parse_env_u64("CHAT_ALERTS_AUTO_CLOSE_MS", &raw)?;
        }

        if let Some(raw) = lookup("CHAT_ALERTS_HOVER_EXIT_CLOSE_MS") {
            self.timings.hover_exit_close_ms =
                parse_env_u64("CHAT_ALERTS_HOVER_EXIT_CLOSE_MS", &raw)?;
        }

        if let Some(raw) = lookup("CHAT_ALERTS_JOURNAL_ENABLED") {
            self.journal.enabled = parse_env_bool("CHAT_ALERTS_JOURNAL_ENABLED", &raw)?;
        }

        // Setting a path implies the journal is wanted.
        if let Some(raw) = lookup("CHAT_ALERTS_JOURNAL_PATH") {
            self.journal.path = PathBuf::from(raw);
            self.journal.enabled = true;
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        for (name, val) in [
            ("auto_close_ms", self.timings.auto_close_ms),
            ("hover_exit_close_ms", self.timings.hover_exit_close_ms),
        ] {
            if val == 0 || val > MAX_CLOSE_DELAY_MS {
                return Err(AlertError::InvalidConfig {
                    details: format!(
                        "timings.{name} must be in [1, {MAX_CLOSE_DELAY_MS}], got {val}"
                    ),
                });
            }
        }

        if self.journal.enabled {
            if self.journal.path.as_os_str().is_empty() {
                return Err(AlertError::InvalidConfig {
                    details: "journal.path must not be empty when the journal is enabled"
                        .to_string(),
                });
            }
            if self.journal.max_size_bytes == 0 {
                return Err(AlertError::InvalidConfig {
                    details: "journal.max_size_bytes must be > 0".to_string(),
                });
            }
        }

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env_u64(name: &str, raw: &str) -> Result<u64> {
    raw.trim()
        .parse::<u64>()
        .map_err(|error| AlertError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}

fn parse_env_bool(name: &str, raw: &str) -> Result<bool> {
    raw.trim()
        .parse::<bool>()
        .map_err(|error| AlertError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })
}
