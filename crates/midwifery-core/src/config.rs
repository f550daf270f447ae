//! # Core configuration: `midwifery.toml`
//!
//! The host app may ship a TOML file next to the database to tune storage and
//! sync behaviour:
//!
//! ```toml
//! [database]
//! path = "midwifery.db"
//!
//! [sync]
//! drain_delay_ms = 2000      # wait before clearing the queue on reconnect
//! drain_on_reconnect = true  # false disables the automatic drain
//! ```
//!
//! Every field has a default, so a missing or empty file is equivalent to
//! [`CoreConfig::default`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Record store location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file path, relative to the host's data directory.
    #[serde(default = "default_database_path")]
    pub path: String,
}

fn default_database_path() -> String {
    "midwifery.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Sync-queue drain behaviour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Fixed delay before the queue is cleared, in milliseconds.
    #[serde(default = "default_drain_delay_ms")]
    pub drain_delay_ms: u64,
    /// Drain automatically when connectivity returns.
    #[serde(default = "default_drain_on_reconnect")]
    pub drain_on_reconnect: bool,
}

fn default_drain_delay_ms() -> u64 {
    2000
}

fn default_drain_on_reconnect() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            drain_delay_ms: default_drain_delay_ms(),
            drain_on_reconnect: default_drain_on_reconnect(),
        }
    }
}

impl SyncConfig {
    pub fn drain_delay(&self) -> Duration {
        Duration::from_millis(self.drain_delay_ms)
    }
}

impl CoreConfig {
    /// The well-known filename for the config file.
    pub fn filename() -> &'static str {
        "midwifery.toml"
    }

    /// Builder method to set the database path.
    pub fn with_database_path(mut self, path: impl Into<String>) -> Self {
        self.database.path = path.into();
        self
    }

    /// Builder method to set the drain delay.
    pub fn with_drain_delay_ms(mut self, ms: u64) -> Self {
        self.sync.drain_delay_ms = ms;
        self
    }

    /// Parse from TOML string.
    pub fn from_toml(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Serialize to TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load from a file; a missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }
}
