//! Offer selection.
//!
//! Picks at most one applicable entry from a manifest: the
//! application-scoped key `"<name>/<application>"` wins over the generic
//! `"<name>"` key, and the chosen entry must be strictly newer than the
//! installed version. Keys are matched exactly, never as prefixes.

use serde::{Deserialize, Serialize};

use crate::identity::AppIdentity;
use crate::manifest::{ManifestEntry, UpdateManifest};
use crate::version::is_newer;

/// A candidate update extracted from the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateOffer {
    /// Manifest key the offer was found under
    pub scope_key: String,
    /// Offered version
    pub version: String,
    /// Download URL
    pub url: String,
}

impl UpdateOffer {
    fn from_entry(scope_key: String, entry: &ManifestEntry) -> Self {
        Self {
            scope_key,
            version: entry.version.clone(),
            url: entry.url.clone(),
        }
    }
}

/// Chooses the applicable offer for an identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfferSelector;

impl OfferSelector {
    /// Select the offer for `identity`, `None` if nothing applies or the
    /// applicable entry is not newer than the installed version.
    pub fn select(&self, manifest: &UpdateManifest, identity: &AppIdentity) -> Option<UpdateOffer> {
        let (scope_key, entry) = [identity.application_scope_key(), identity.generic_scope_key()]
            .into_iter()
            .find_map(|key| manifest.get(&key).map(|entry| (key, entry)))?;

        if !is_newer(&entry.version, &identity.version) {
            tracing::debug!(
                scope_key = %scope_key,
                offered = %entry.version,
                installed = %identity.version,
                "Offered version is not newer than installed version"
            );
            return None;
        }

        tracing::debug!(
            scope_key = %scope_key,
            version = %entry.version,
            "Selected update offer"
        );
        Some(UpdateOffer::from_entry(scope_key, entry))
    }
}
