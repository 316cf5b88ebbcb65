//! upcheck CLI - run update checks from the command line
//!
//! This crate provides a command-line interface for:
//! - Running a single manual or automatic-style check
//! - Watching for updates on the configured schedule
//! - Inspecting and resetting persisted rollout state

pub mod cli;
pub mod config;
pub mod output;

pub use cli::Cli;
pub use config::{CliOverrides, Config};
pub use output::{CheckReport, OutputFormat, OutputFormatter};

use upcheck::{CheckOutcome, UpdateError};

/// Exit codes for CLI operations
///
/// - 0: Success, including "no update available"
/// - 1: General error
/// - 2: Request failed (network or HTTP status)
/// - 3: Manifest could not be parsed
/// - 4: Offered download URL is insecure
/// - 5: Invalid input or configuration
/// - 6: Another check is in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    RequestFailed = 2,
    MalformedManifest = 3,
    InsecureUrl = 4,
    InvalidInput = 5,
    CheckInProgress = 6,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl ExitCode {
    /// Convert to process exit code
    pub fn to_exit_code(self) -> std::process::ExitCode {
        std::process::ExitCode::from(self as u8)
    }

    /// Exit code for a failed check
    pub fn from_error(error: &UpdateError) -> Self {
        match error {
            e if e.is_transport_failure() => ExitCode::RequestFailed,
            UpdateError::MalformedManifest(_) => ExitCode::MalformedManifest,
            UpdateError::InsecureUrl(_) => ExitCode::InsecureUrl,
            UpdateError::CheckInProgress => ExitCode::CheckInProgress,
            UpdateError::MissingPreference(_)
            | UpdateError::InvalidRequest(_)
            | UpdateError::ConfigError(_) => ExitCode::InvalidInput,
            _ => ExitCode::GeneralError,
        }
    }

    /// Exit code for a check outcome
    pub fn from_outcome(outcome: &CheckOutcome) -> Self {
        outcome.error().map_or(ExitCode::Success, Self::from_error)
    }

    /// Get the exit code name as a string
    pub fn name(&self) -> &'static str {
        match self {
            ExitCode::Success => "SUCCESS",
            ExitCode::GeneralError => "GENERAL_ERROR",
            ExitCode::RequestFailed => "REQUEST_FAILED",
            ExitCode::MalformedManifest => "MALFORMED_MANIFEST",
            ExitCode::InsecureUrl => "INSECURE_URL",
            ExitCode::InvalidInput => "INVALID_INPUT",
            ExitCode::CheckInProgress => "CHECK_IN_PROGRESS",
        }
    }
}
