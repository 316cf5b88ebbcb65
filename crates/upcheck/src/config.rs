//! Configuration structures for the update checker.
//!
//! Defines the `%TYPE%` codes, automatic check scheduling and network
//! settings. Everything has a default so an empty TOML file is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::UpdateError;
use crate::url_builder::CheckTypeCodes;

/// Main update-check configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Where the rollout counters and check times are persisted
    /// (`None` = memory only)
    #[serde(default)]
    pub state_path: Option<PathBuf>,

    /// Values substituted for `%TYPE%`
    #[serde(default)]
    pub check_codes: CheckTypeCodes,

    /// Automatic check scheduling
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Network configuration
    #[serde(default)]
    pub network: NetworkConfig,
}

impl UpdaterConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, UpdateError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| UpdateError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save_to_file(&self, path: &Path) -> Result<(), UpdateError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| UpdateError::ConfigError(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), UpdateError> {
        if self.schedule.check_interval_hours == 0 {
            return Err(UpdateError::ConfigError(
                "check_interval_hours must be greater than 0".to_string(),
            ));
        }
        if self.network.timeout_seconds == 0 {
            return Err(UpdateError::ConfigError(
                "timeout_seconds must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Scheduling of automatic checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Whether automatic checks run at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Delay before the first automatic check when none is persisted
    #[serde(default = "default_initial_delay")]
    pub initial_delay_secs: u64,

    /// Interval between automatic checks in hours
    #[serde(default = "default_check_interval")]
    pub check_interval_hours: u32,

    /// Upper bound of the random delay added to each interval
    #[serde(default)]
    pub jitter_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay_secs: default_initial_delay(),
            check_interval_hours: default_check_interval(),
            jitter_secs: 0,
        }
    }
}

impl ScheduleConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.check_interval_hours) * 3600)
    }
}

/// Network configuration for manifest requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// User agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_initial_delay() -> u64 {
    60
}

fn default_check_interval() -> u32 {
    24 // Daily
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("upcheck/{}", env!("CARGO_PKG_VERSION"))
}
