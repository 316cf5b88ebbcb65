//! Configuration management for the upcheck CLI
//!
//! Configuration is stored in TOML format and combines the identity being
//! checked, update URL preferences, the library's `UpdaterConfig` and
//! logging settings.
//!
//! # Configuration File Locations
//!
//! - Unix: `~/.config/upcheck/upcheck.toml`
//! - Windows: `%APPDATA%\upcheck\upcheck.toml`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use upcheck::{
    AppIdentity, MemoryPreferences, StaticEnvironment, UpdaterConfig, UPDATE_URL_DEVBUILD,
    UPDATE_URL_RELEASE,
};

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse config file
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Error reported by the update library
    #[error(transparent)]
    Updater(#[from] upcheck::UpdateError),
}

/// CLI configuration
///
/// # Example TOML
///
/// ```toml
/// [identity]
/// name = "adblockplus"
/// version = "3.0"
/// application = "android"
/// application_version = "12"
/// development_build = false
///
/// [preferences]
/// # file = "prefs.toml"  # flat table of preference overrides
/// # update_url_release = "https://example.com/%NAME%/update.json?type=%TYPE%"
///
/// [updater.schedule]
/// check_interval_hours = 24
///
/// [logging]
/// level = "warn"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Identity reported to the update server
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Update URL preferences
    #[serde(default)]
    pub preferences: PreferencesConfig,

    /// Library configuration
    #[serde(default)]
    pub updater: UpdaterConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Identity configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub application: String,

    #[serde(default)]
    pub application_version: String,

    #[serde(default)]
    pub development_build: bool,

    /// Platform reported to the server (empty = build target)
    #[serde(default)]
    pub platform: Option<String>,

    /// Platform version reported to the server (empty = CLI version)
    #[serde(default)]
    pub platform_version: Option<String>,
}

impl IdentityConfig {
    /// Identity handed to the update session
    pub fn to_identity(&self) -> AppIdentity {
        AppIdentity::new(
            &self.name,
            &self.version,
            &self.application,
            &self.application_version,
        )
        .with_development_build(self.development_build)
    }

    /// Environment handed to the update session
    pub fn environment(&self) -> StaticEnvironment {
        let host = StaticEnvironment::host();
        match (&self.platform, &self.platform_version) {
            (None, None) => host,
            (platform, version) => StaticEnvironment::new(
                platform.clone().unwrap_or_else(upcheck::current_platform),
                version
                    .clone()
                    .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            ),
        }
    }
}

/// Preferences configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreferencesConfig {
    /// Flat TOML table of preference overrides
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Release template override
    #[serde(default)]
    pub update_url_release: Option<String>,

    /// Development build template override
    #[serde(default)]
    pub update_url_devbuild: Option<String>,
}

impl PreferencesConfig {
    /// Build the preference store: defaults, then the file, then inline values
    pub fn load(&self) -> Result<MemoryPreferences, ConfigError> {
        let mut prefs = match &self.file {
            Some(path) => MemoryPreferences::load_from_file(path)?,
            None => MemoryPreferences::new(),
        };
        if let Some(url) = &self.update_url_release {
            prefs.set(UPDATE_URL_RELEASE, url.clone());
        }
        if let Some(url) = &self.update_url_devbuild {
            prefs.set(UPDATE_URL_DEVBUILD, url.clone());
        }
        Ok(prefs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location
    pub fn load_default() -> Result<Self, ConfigError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::load(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from custom path or default
    pub fn load_from(custom_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = custom_path {
            Self::load(path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration, apply CLI overrides and validate the result
    pub fn load_with_overrides(
        custom_path: Option<&Path>,
        overrides: &CliOverrides,
    ) -> Result<Self, ConfigError> {
        let config = Self::load_from(custom_path)?.with_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("org", "upcheck", "upcheck")
    }

    /// Get default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join("upcheck.toml"))
    }

    /// Get the data directory path (for persisted update state)
    pub fn data_dir() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
    }

    /// Where update state is persisted: the configured path, else the data
    /// directory
    pub fn state_path(&self) -> Option<PathBuf> {
        self.updater
            .state_path
            .clone()
            .or_else(|| Self::data_dir().map(|dir| dir.join("state.json")))
    }

    /// Library configuration with the state path resolved
    pub fn resolved_updater(&self) -> UpdaterConfig {
        let mut updater = self.updater.clone();
        updater.state_path = self.state_path();
        updater
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Invalid log level '{}'. Valid values: {:?}",
                self.logging.level, valid_levels
            )));
        }

        if self.identity.name.contains('/') {
            return Err(ConfigError::ValidationError(format!(
                "Invalid identity name '{}': must not contain '/'",
                self.identity.name
            )));
        }

        self.updater.validate()?;
        Ok(())
    }

    /// Check that everything needed to run a check is present
    pub fn require_identity(&self) -> Result<(), ConfigError> {
        let missing: Vec<&str> = [
            ("name", &self.identity.name),
            ("version", &self.identity.version),
            ("application", &self.identity.application),
            ("application_version", &self.identity.application_version),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(field, _)| field)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError(format!(
                "Missing identity fields: {}",
                missing.join(", ")
            )))
        }
    }

    /// Generate a sample configuration file content
    pub fn sample_toml() -> &'static str {
        r#"# upcheck configuration

[identity]
# Add-on being checked
name = "adblockplus"
version = "3.0"
# Host application
application = "android"
application_version = "12"
# Use the devbuild update URL
development_build = false

[preferences]
# Flat table of preference overrides
# file = "prefs.toml"
# update_url_release = "https://update.adblockplus.org/%NAME%/update.json?type=%TYPE%"

[updater.check_codes]
manual = "1"
automatic = "0"

[updater.schedule]
enabled = true
initial_delay_secs = 60
check_interval_hours = 24
jitter_secs = 0

[updater.network]
timeout_seconds = 30

[logging]
# Log level: "error", "warn", "info", "debug", "trace"
level = "warn"
"#
    }
}

/// CLI configuration overrides
///
/// Command-line arguments take precedence over config file values.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub debug: Option<bool>,
    pub name: Option<String>,
    pub version: Option<String>,
    pub application: Option<String>,
    pub application_version: Option<String>,
    pub development_build: Option<bool>,
    pub state_path: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to configuration
    pub fn with_overrides(mut self, overrides: &CliOverrides) -> Self {
        if overrides.debug == Some(true) {
            self.logging.level = "debug".to_string();
        }
        if let Some(ref name) = overrides.name {
            self.identity.name = name.clone();
        }
        if let Some(ref version) = overrides.version {
            self.identity.version = version.clone();
        }
        if let Some(ref application) = overrides.application {
            self.identity.application = application.clone();
        }
        if let Some(ref application_version) = overrides.application_version {
            self.identity.application_version = application_version.clone();
        }
        if let Some(development_build) = overrides.development_build {
            self.identity.development_build = development_build;
        }
        if let Some(ref path) = overrides.state_path {
            self.updater.state_path = Some(path.clone());
        }
        self
    }
}
