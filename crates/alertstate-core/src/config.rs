//! Tracker configuration, loaded from TOML.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default pruning period: one hour.
pub const DEFAULT_PRUNE_INTERVAL_SECS: u64 = 60 * 60;
/// Default number of evaluations kept per instance.
pub const DEFAULT_MAX_HISTORY: usize = 100;
/// Longest accepted pruning period: one year.
pub const MAX_PRUNE_INTERVAL_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// Seconds between two pruning sweeps.
    pub prune_interval_secs: u64,
    /// Evaluation history entries kept per instance after a sweep.
    pub max_history: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            prune_interval_secs: DEFAULT_PRUNE_INTERVAL_SECS,
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

impl TrackerConfig {
    /// Read and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prune_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "prune_interval_secs must be greater than zero".into(),
            ));
        }
        if self.prune_interval_secs > MAX_PRUNE_INTERVAL_SECS {
            return Err(ConfigError::Invalid(format!(
                "prune_interval_secs must be at most {MAX_PRUNE_INTERVAL_SECS}"
            )));
        }
        if self.max_history == 0 {
            return Err(ConfigError::Invalid(
                "max_history must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_secs)
    }
}
