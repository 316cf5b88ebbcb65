//! Outbound request transport.
//!
//! The update checker never talks to the network directly: it hands a
//! [`WebRequest`] to a [`Transport`] and gets back a [`ServerResponse`].
//! `TransportStatus` separates transport-level failures (no response at all)
//! from HTTP-level responses, whatever their status code.
//!
//! Request headers are filtered on construction. Headers that the HTTP stack
//! owns or that could be used to impersonate the browser layer are dropped
//! with a warning.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::config::NetworkConfig;
use crate::error::UpdateError;

/// Headers a caller may never set, compared case-insensitively.
const FORBIDDEN_HEADERS: &[&str] = &[
    "accept-charset",
    "accept-encoding",
    "connection",
    "content-length",
    "content-transfer-encoding",
    "cookie",
    "cookie2",
    "date",
    "dnt",
    "expect",
    "host",
    "keep-alive",
    "referer",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "via",
];

/// Header name prefixes a caller may never use.
const FORBIDDEN_HEADER_PREFIXES: &[&str] = &["proxy-", "sec-"];

/// Whether a header name is reserved for the transport.
pub fn is_forbidden_header(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    FORBIDDEN_HEADERS.contains(&lower.as_str())
        || FORBIDDEN_HEADER_PREFIXES
            .iter()
            .any(|prefix| lower.starts_with(prefix))
}

/// A GET request handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebRequest {
    url: String,
    headers: Vec<(String, String)>,
}

impl WebRequest {
    /// Create a request for `url`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if the URL is empty.
    pub fn new(url: impl Into<String>) -> Result<Self, UpdateError> {
        let url = url.into();
        if url.is_empty() {
            return Err(UpdateError::InvalidRequest(
                "request URL must not be empty".to_string(),
            ));
        }
        Ok(Self {
            url,
            headers: Vec::new(),
        })
    }

    /// Add a header. Empty names or values are ignored, forbidden headers
    /// are dropped.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        let value = value.into();
        if name.is_empty() || value.is_empty() {
            return self;
        }
        if is_forbidden_header(&name) {
            warn!("Attempt to set a forbidden header was denied: {}", name);
            return self;
        }
        self.headers.push((name, value));
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Whether a header with this name (case-insensitive) was kept.
    pub fn has_header(&self, name: &str) -> bool {
        self.headers
            .iter()
            .any(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

/// Transport-level result of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportStatus {
    /// A response was received (its HTTP status may still be an error)
    Ok,
    /// No response: connection, resolution or protocol failure
    Failed(String),
}

/// Response delivered by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerResponse {
    pub status: TransportStatus,
    /// HTTP status code, 0 when no response was received
    pub response_status: u16,
    pub response_text: String,
    pub response_headers: Vec<(String, String)>,
}

impl ServerResponse {
    /// A received response with the given HTTP status and body.
    pub fn ok(response_status: u16, response_text: impl Into<String>) -> Self {
        Self {
            status: TransportStatus::Ok,
            response_status,
            response_text: response_text.into(),
            response_headers: Vec::new(),
        }
    }

    /// A transport-level failure.
    pub fn failed(description: impl Into<String>) -> Self {
        Self {
            status: TransportStatus::Failed(description.into()),
            response_status: 0,
            response_text: String::new(),
            response_headers: Vec::new(),
        }
    }

    /// Whether the HTTP status is in the 2xx range.
    pub fn is_http_success(&self) -> bool {
        (200..300).contains(&self.response_status)
    }

    /// Case-insensitive response header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.response_headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Turn the response into its body, or the error the checker reports.
    ///
    /// Non-2xx responses count as transport failures; their body is never
    /// parsed.
    pub fn into_body(self) -> Result<String, UpdateError> {
        match self.status {
            TransportStatus::Failed(description) => Err(UpdateError::TransportFailure(description)),
            TransportStatus::Ok if !self.is_http_success() => Err(UpdateError::HttpStatus {
                status: self.response_status,
            }),
            TransportStatus::Ok => Ok(self.response_text),
        }
    }
}

/// Executes outbound requests.
///
/// Implementations must always produce a response; failures are reported
/// through `TransportStatus::Failed`. Timeouts, if any, are the
/// implementation's concern.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, request: WebRequest) -> ServerResponse;
}

/// HTTPS transport backed by `reqwest`.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport from network settings.
    pub fn new(config: &NetworkConfig) -> Result<Self, UpdateError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_seconds))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: WebRequest) -> ServerResponse {
        debug!(url = %request.url(), "Sending request");

        let mut builder = self.client.get(request.url());
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                error!(url = %request.url(), error = %e, "Request failed");
                return ServerResponse::failed(e.to_string());
            }
        };

        let response_status = response.status().as_u16();
        let response_headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        match response.text().await {
            Ok(response_text) => {
                debug!(
                    status = response_status,
                    bytes = response_text.len(),
                    "Received response"
                );
                ServerResponse {
                    status: TransportStatus::Ok,
                    response_status,
                    response_text,
                    response_headers,
                }
            }
            Err(e) => {
                error!(url = %request.url(), error = %e, "Failed to read response body");
                ServerResponse::failed(e.to_string())
            }
        }
    }
}
