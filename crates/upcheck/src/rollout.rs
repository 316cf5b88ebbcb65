//! Rollout counters and persisted scheduler state.
//!
//! `RolloutState` is sent back to the server with every check so it can run
//! staged rollouts. It changes only after a check completes with an accepted
//! offer. `PersistedState` wraps it together with the scheduler's check
//! times and is stored as JSON.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::UpdateError;
use crate::selector::UpdateOffer;

/// Counters reported to the update server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RolloutState {
    /// Version of the most recently accepted offer, `"0"` if none yet
    #[serde(default = "default_last_version")]
    pub last_version: String,
    /// Number of accepted offers
    #[serde(default)]
    pub download_count: u64,
}

impl Default for RolloutState {
    fn default() -> Self {
        Self {
            last_version: default_last_version(),
            download_count: 0,
        }
    }
}

impl RolloutState {
    /// Record an accepted offer.
    pub fn record_offer(&mut self, offer: &UpdateOffer) {
        self.last_version = offer.version.clone();
        self.download_count = self.download_count.saturating_add(1);
    }
}

fn default_last_version() -> String {
    "0".to_string()
}

/// Everything the scheduler keeps across restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub rollout: RolloutState,
    /// When the last check completed
    #[serde(default)]
    pub last_check: Option<DateTime<Utc>>,
    /// When the next automatic check is due
    #[serde(default)]
    pub next_check: Option<DateTime<Utc>>,
}

impl PersistedState {
    /// Load state from a file, defaults if it does not exist.
    pub fn load(path: &Path) -> Result<Self, UpdateError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let state: Self = serde_json::from_str(&content)?;
        Ok(state)
    }

    /// Save state to a file.
    pub fn save(&self, path: &Path) -> Result<(), UpdateError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
