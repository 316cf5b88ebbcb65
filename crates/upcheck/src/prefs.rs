//! Preference store consumed by the update checker.
//!
//! Only two keys are read here: the release and devbuild URL templates.
//! The store itself belongs to the embedding engine; `MemoryPreferences`
//! is the in-process implementation used by the CLI and tests.

use std::collections::HashMap;
use std::path::Path;

use crate::error::UpdateError;

/// Preference key for the release-build update URL template.
pub const UPDATE_URL_RELEASE: &str = "update_url_release";

/// Preference key for the development-build update URL template.
pub const UPDATE_URL_DEVBUILD: &str = "update_url_devbuild";

const DEFAULT_UPDATE_URL_RELEASE: &str =
    "https://update.adblockplus.org/%NAME%/update.json?type=%TYPE%";
const DEFAULT_UPDATE_URL_DEVBUILD: &str =
    "https://adblockplus.org/devbuilds/%NAME%/update.json?type=%TYPE%";

/// Read-only view of the engine's preferences.
pub trait PreferenceStore: Send + Sync {
    /// Get a string preference, `None` if the key is unknown.
    fn get_string(&self, key: &str) -> Option<String>;
}

/// In-memory preference store seeded with the built-in defaults.
#[derive(Debug, Clone)]
pub struct MemoryPreferences {
    values: HashMap<String, String>,
}

impl Default for MemoryPreferences {
    fn default() -> Self {
        let mut values = HashMap::new();
        values.insert(
            UPDATE_URL_RELEASE.to_string(),
            DEFAULT_UPDATE_URL_RELEASE.to_string(),
        );
        values.insert(
            UPDATE_URL_DEVBUILD.to_string(),
            DEFAULT_UPDATE_URL_DEVBUILD.to_string(),
        );
        Self { values }
    }
}

impl MemoryPreferences {
    /// Create a store containing only the built-in defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with no values at all.
    pub fn empty() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Override a single preference.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a preference value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Load overrides from a flat TOML table on top of the defaults.
    ///
    /// Non-string values are rejected.
    pub fn load_from_file(path: &Path) -> Result<Self, UpdateError> {
        let content = std::fs::read_to_string(path)?;
        let table: toml::Table = toml::from_str(&content)?;

        let mut prefs = Self::default();
        for (key, value) in table {
            match value {
                toml::Value::String(s) => prefs.set(key, s),
                other => {
                    return Err(UpdateError::ConfigError(format!(
                        "preference '{}' must be a string, got {}",
                        key,
                        other.type_str()
                    )))
                }
            }
        }
        Ok(prefs)
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get_string(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}
