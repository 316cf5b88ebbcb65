//! Update manifest parsing.
//!
//! The manifest is a JSON object mapping scope keys to update entries:
//!
//! ```json
//! { "adblockplus": { "version": "3.1", "url": "https://example.com/abp-3.1.zip" },
//!   "adblockplus/android": { "version": "3.2", "url": "https://example.com/abp-android.zip" } }
//! ```
//!
//! Keys are kept verbatim; deciding which one applies is the selector's job.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::UpdateError;

/// One entry of the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Dotted-numeric version offered by this entry
    pub version: String,
    /// Download URL for that version
    pub url: String,
}

/// Parsed manifest: scope key → entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateManifest {
    entries: BTreeMap<String, ManifestEntry>,
}

impl UpdateManifest {
    /// Parse a manifest from a response body.
    ///
    /// # Errors
    ///
    /// Returns `MalformedManifest` if the body is not a JSON object or any
    /// entry lacks a string `version` or `url`.
    pub fn parse(body: &str) -> Result<Self, UpdateError> {
        let manifest: Self = serde_json::from_str(body)
            .map_err(|e| UpdateError::MalformedManifest(e.to_string()))?;

        tracing::debug!(
            entries = manifest.entries.len(),
            "Parsed update manifest"
        );
        Ok(manifest)
    }

    /// Look up an entry by its exact scope key.
    pub fn get(&self, scope_key: &str) -> Option<&ManifestEntry> {
        self.entries.get(scope_key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, ManifestEntry)> for UpdateManifest {
    fn from_iter<I: IntoIterator<Item = (String, ManifestEntry)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_entry() {
        let manifest =
            UpdateManifest::parse(r#"{"1": {"version":"3.1","url":"https://foo.bar/"}}"#).unwrap();
        assert_eq!(manifest.len(), 1);
        let entry = manifest.get("1").unwrap();
        assert_eq!(entry.version, "3.1");
        assert_eq!(entry.url, "https://foo.bar/");
    }

    #[test]
    fn test_parse_keeps_keys_verbatim() {
        let manifest = UpdateManifest::parse(
            r#"{"1/4": {"version":"3.1","url":"https://a/"}, "weird key//": {"version":"1","url":"x"}}"#,
        )
        .unwrap();
        assert!(manifest.get("1/4").is_some());
        assert!(manifest.get("weird key//").is_some());
        assert!(manifest.get("1").is_none());
    }

    #[test]
    fn test_extra_fields_ignored() {
        let manifest = UpdateManifest::parse(
            r#"{"1": {"version":"3.1","url":"https://foo.bar/","notes":"hello"}}"#,
        )
        .unwrap();
        assert_eq!(manifest.get("1").unwrap().version, "3.1");
    }

    #[test]
    fn test_empty_object() {
        let manifest = UpdateManifest::parse("{}").unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_not_json() {
        let result = UpdateManifest::parse("<html>Not Found</html>");
        assert!(matches!(result, Err(UpdateError::MalformedManifest(_))));
    }

    #[test]
    fn test_not_an_object() {
        assert!(matches!(
            UpdateManifest::parse("[1, 2, 3]"),
            Err(UpdateError::MalformedManifest(_))
        ));
        assert!(matches!(
            UpdateManifest::parse(r#"{"1": "3.1"}"#),
            Err(UpdateError::MalformedManifest(_))
        ));
    }

    #[test]
    fn test_missing_fields() {
        assert!(matches!(
            UpdateManifest::parse(r#"{"1": {"version":"3.1"}}"#),
            Err(UpdateError::MalformedManifest(_))
        ));
        assert!(matches!(
            UpdateManifest::parse(r#"{"1": {"url":"https://foo.bar/"}}"#),
            Err(UpdateError::MalformedManifest(_))
        ));
    }

    #[test]
    fn test_non_string_fields() {
        let result = UpdateManifest::parse(r#"{"1": {"version":3.1,"url":"https://foo.bar/"}}"#);
        assert!(matches!(result, Err(UpdateError::MalformedManifest(_))));
    }

    #[test]
    fn test_from_iter() {
        let manifest: UpdateManifest = vec![(
            "1".to_string(),
            ManifestEntry {
                version: "2".to_string(),
                url: "https://x/".to_string(),
            },
        )]
        .into_iter()
        .collect();
        assert_eq!(manifest.get("1").unwrap().version, "2");
    }
}
