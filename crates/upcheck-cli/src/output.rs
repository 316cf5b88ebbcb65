//! Output formatting for CLI results
//!
//! Supports three formats:
//! - Table: Human-readable tables (default)
//! - JSON: Structured JSON for scripting
//! - Quiet: No output, exit codes only

use std::str::FromStr;

use comfy_table::{presets::UTF8_FULL, Table};
use serde::Serialize;
use upcheck::{CheckOutcome, PersistedState};

/// Output format options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Quiet,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "quiet" => Ok(Self::Quiet),
            _ => Err(format!("Unknown output format: {s}")),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Table => write!(f, "table"),
            Self::Json => write!(f, "json"),
            Self::Quiet => write!(f, "quiet"),
        }
    }
}

/// Result of one check, as printed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub update_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope_key: Option<String>,
    /// Completion error, empty on success
    pub error: String,
    pub timestamp: String,
}

impl CheckReport {
    pub fn from_outcome(outcome: &CheckOutcome) -> Self {
        let offer = outcome.offer();
        Self {
            update_available: offer.is_some(),
            version: offer.map(|o| o.version.clone()),
            url: offer.map(|o| o.url.clone()),
            scope_key: offer.map(|o| o.scope_key.clone()),
            error: outcome.error_message(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Formats reports for the selected output format
#[derive(Debug, Clone, Copy)]
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Render a check report, `None` in quiet mode
    pub fn check(&self, report: &CheckReport) -> Option<String> {
        match self.format {
            OutputFormat::Quiet => None,
            OutputFormat::Json => serde_json::to_string_pretty(report).ok(),
            OutputFormat::Table => Some(match (&report.version, &report.url) {
                _ if !report.error.is_empty() => format!("Update check failed: {}", report.error),
                (Some(version), Some(url)) => format!("Update available: {version}\n  {url}"),
                _ => "No update available".to_string(),
            }),
        }
    }

    /// Render persisted state, `None` in quiet mode
    pub fn state(&self, state: &PersistedState) -> Option<String> {
        match self.format {
            OutputFormat::Quiet => None,
            OutputFormat::Json => serde_json::to_string_pretty(state).ok(),
            OutputFormat::Table => {
                let mut table = Table::new();
                table.load_preset(UTF8_FULL);
                table.set_header(vec!["Field", "Value"]);
                table.add_row(vec!["Last version", state.rollout.last_version.as_str()]);
                table.add_row(vec![
                    "Download count".to_string(),
                    state.rollout.download_count.to_string(),
                ]);
                table.add_row(vec!["Last check".to_string(), format_time(state.last_check)]);
                table.add_row(vec!["Next check".to_string(), format_time(state.next_check)]);
                Some(table.to_string())
            }
        }
    }
}

fn format_time(time: Option<chrono::DateTime<chrono::Utc>>) -> String {
    time.map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "never".to_string())
}
