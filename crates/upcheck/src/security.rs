//! Download URL security gate.
//!
//! The manifest request itself may travel over a channel that says nothing
//! about the next hop, so every offered download URL must use HTTPS on its
//! own. URLs that do not parse are rejected as well.

use url::Url;

use crate::error::UpdateError;
use crate::selector::UpdateOffer;

/// Scheme required for download URLs.
pub const SECURE_SCHEME: &str = "https";

/// Rejects offers whose download URL is not transport-secure.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityGate;

impl SecurityGate {
    /// Pass the offer through unchanged if its URL is secure.
    pub fn check(&self, offer: UpdateOffer) -> Result<UpdateOffer, UpdateError> {
        if is_secure_url(&offer.url) {
            Ok(offer)
        } else {
            tracing::warn!(
                url = %offer.url,
                version = %offer.version,
                "Rejecting update offer with insecure download URL"
            );
            Err(UpdateError::InsecureUrl(offer.url))
        }
    }
}

/// Whether `url` parses and uses the secure scheme.
pub fn is_secure_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed.scheme() == SECURE_SCHEME && parsed.has_host(),
        Err(_) => false,
    }
}
