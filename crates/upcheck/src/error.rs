//! Error types for the update-check client.

use thiserror::Error;

/// Errors that can occur while checking for updates.
///
/// The `Display` output of every variant is the human-readable string handed
/// to completion callbacks.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The transport could not complete the request (name resolution,
    /// connection refused, TLS failure and similar)
    #[error("update check request failed: {0}")]
    TransportFailure(String),

    /// The transport completed but the server answered with a non-2xx status
    #[error("update server responded with status {status}")]
    HttpStatus { status: u16 },

    /// The response body is not a valid update manifest
    #[error("malformed update manifest: {0}")]
    MalformedManifest(String),

    /// The offered download URL does not use a secure transport
    #[error("insecure update url: {0}")]
    InsecureUrl(String),

    /// Another check is still waiting for its response
    #[error("an update check is already in progress")]
    CheckInProgress,

    /// A required preference is missing from the preference store
    #[error("missing preference: {0}")]
    MissingPreference(String),

    /// The outbound request was rejected before submission
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    HttpError(String),
}

impl UpdateError {
    /// Whether this error means the request never produced a usable response.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            UpdateError::TransportFailure(_) | UpdateError::HttpStatus { .. } | UpdateError::HttpError(_)
        )
    }
}

impl From<reqwest::Error> for UpdateError {
    fn from(err: reqwest::Error) -> Self {
        UpdateError::HttpError(err.to_string())
    }
}

impl From<toml::de::Error> for UpdateError {
    fn from(err: toml::de::Error) -> Self {
        UpdateError::ConfigError(err.to_string())
    }
}
