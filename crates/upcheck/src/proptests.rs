//! Property-based tests for upcheck.
//!
//! These tests use proptest to verify correctness properties across
//! randomly generated identities, manifests and versions.
//!
//! # Properties Tested
//!
//! - Property 1: Scope keys for other applications never match
//! - Property 2: Offers that are not newer are never selected
//! - Property 3: Newer secure offers produce exactly one event
//! - Property 4: Newer insecure offers produce an error and no event
//! - Property 5: The application-scoped key wins over the generic key
//! - Property 6: Transport failures never reach the manifest parser
//! - Property 7: Version comparison is a total order
//! - Property 8: Placeholder values are never rescanned

#![cfg(test)]

use std::cmp::Ordering;
use std::sync::Arc;

use proptest::prelude::*;

use crate::identity::AppIdentity;
use crate::manifest::{ManifestEntry, UpdateManifest};
use crate::platform::StaticEnvironment;
use crate::prefs::MemoryPreferences;
use crate::rollout::RolloutState;
use crate::selector::OfferSelector;
use crate::session::{CheckOutcome, UpdateCheckSession};
use crate::testing::{MockTransport, RecordingListener};
use crate::transport::ServerResponse;
use crate::url_builder::{CheckTrigger, UrlBuilder};
use crate::version::compare_versions;

// =============================================================================
// Generators
// =============================================================================

/// Generate a scope-safe identifier (no `/`).
fn arb_ident() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,11}"
}

/// Generate a dotted-numeric version with 1 to 4 components.
fn arb_version() -> impl Strategy<Value = String> {
    prop::collection::vec(0u32..50, 1..=4).prop_map(|parts| {
        parts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    })
}

/// Generate a version strictly greater than `base` by bumping one component.
fn arb_newer_version(base: String) -> impl Strategy<Value = String> {
    let len = base.split('.').count();
    (0..len, 1u32..10).prop_map(move |(index, bump)| {
        base.split('.')
            .enumerate()
            .map(|(i, part)| {
                let n: u32 = part.parse().unwrap_or(0);
                let n = if i == index { n + bump } else { n };
                n.to_string()
            })
            .collect::<Vec<_>>()
            .join(".")
    })
}

fn arb_identity() -> impl Strategy<Value = AppIdentity> {
    (arb_ident(), arb_version(), arb_ident(), arb_version()).prop_map(
        |(name, version, application, application_version)| {
            AppIdentity::new(name, version, application, application_version)
        },
    )
}

/// Generate an identity together with a version newer than its own.
fn arb_identity_with_newer() -> impl Strategy<Value = (AppIdentity, String)> {
    arb_identity().prop_flat_map(|identity| {
        let newer = arb_newer_version(identity.version.clone());
        (Just(identity), newer)
    })
}

fn arb_insecure_url() -> impl Strategy<Value = String> {
    prop_oneof![
        arb_ident().prop_map(|host| format!("http://{host}/")),
        arb_ident().prop_map(|host| format!("ftp://{host}/file")),
        Just("not a url".to_string()),
        Just(String::new()),
    ]
}

// =============================================================================
// Helper Functions
// =============================================================================

fn manifest(entries: &[(&str, &str, &str)]) -> UpdateManifest {
    entries
        .iter()
        .map(|(key, version, url)| {
            (
                key.to_string(),
                ManifestEntry {
                    version: version.to_string(),
                    url: url.to_string(),
                },
            )
        })
        .collect()
}

/// Run one manual check against a canned response and collect the outcome
/// together with the events it produced.
fn run_check(identity: AppIdentity, response: ServerResponse) -> (CheckOutcome, Vec<String>) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    runtime.block_on(async move {
        let session = UpdateCheckSession::new(
            identity,
            Arc::new(MemoryPreferences::new()),
            Arc::new(StaticEnvironment::new("libadblockplus", "1.0")),
            Arc::new(MockTransport::with_response(response)),
        );
        let listener = RecordingListener::attach(session.listeners());
        let outcome = session.run(CheckTrigger::Manual, &RolloutState::default()).await;
        (outcome, listener.calls())
    })
}

fn manifest_body(key: &str, version: &str, url: &str) -> String {
    serde_json::json!({ key: { "version": version, "url": url } }).to_string()
}

// =============================================================================
// Property 1: Scope keys for other applications never match
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_other_application_never_matches(
        (identity, newer) in arb_identity_with_newer(),
        other in arb_ident(),
    ) {
        prop_assume!(other != identity.application);
        let key = format!("{}/{}", identity.name, other);
        let manifest = manifest(&[(key.as_str(), newer.as_str(), "https://foo.bar/")]);

        prop_assert!(OfferSelector.select(&manifest, &identity).is_none());
    }

    // =========================================================================
    // Property 2: Offers that are not newer are never selected
    // =========================================================================

    #[test]
    fn prop_not_newer_never_selected(
        identity in arb_identity(),
        version in arb_version(),
        secure in any::<bool>(),
    ) {
        prop_assume!(compare_versions(&version, &identity.version) != Ordering::Greater);
        let url = if secure { "https://foo.bar/" } else { "http://foo.bar/" };
        let manifest = manifest(&[(identity.name.as_str(), version.as_str(), url)]);

        prop_assert!(OfferSelector.select(&manifest, &identity).is_none());
    }

    // =========================================================================
    // Property 5: The application-scoped key wins over the generic key
    // =========================================================================

    #[test]
    fn prop_scoped_key_wins(
        (identity, newer) in arb_identity_with_newer(),
    ) {
        let scoped = identity.application_scope_key();
        let manifest = manifest(&[
            (identity.name.as_str(), newer.as_str(), "https://generic/"),
            (scoped.as_str(), newer.as_str(), "https://scoped/"),
        ]);

        let offer = OfferSelector.select(&manifest, &identity);
        prop_assert_eq!(offer.map(|o| (o.scope_key, o.url)), Some((scoped, "https://scoped/".to_string())));
    }

    // =========================================================================
    // Property 7: Version comparison is a total order
    // =========================================================================

    #[test]
    fn prop_version_compare_antisymmetric(a in arb_version(), b in arb_version()) {
        prop_assert_eq!(compare_versions(&a, &b), compare_versions(&b, &a).reverse());
    }

    #[test]
    fn prop_trailing_zero_is_equal(v in arb_version()) {
        let padded = format!("{v}.0");
        prop_assert_eq!(compare_versions(&v, &padded), Ordering::Equal);
    }

    // =========================================================================
    // Property 8: Placeholder values are never rescanned
    // =========================================================================

    #[test]
    fn prop_name_substituted_verbatim(
        prefix in "[a-z]{0,5}",
        suffix in "[a-z]{0,5}",
    ) {
        let name = format!("{prefix}%TYPE%{suffix}");
        let identity = AppIdentity::new(name.clone(), "1", "app", "1");
        let url = UrlBuilder::default().build(
            "https://h/%NAME%?type=%TYPE%",
            &identity,
            &StaticEnvironment::new("p", "v"),
            &RolloutState::default(),
            CheckTrigger::Manual,
        );

        let expected_prefix = format!("https://h/{name}?type=1&addonName={name}&");
        prop_assert!(url.starts_with(&expected_prefix), "unexpected url {}", url);
    }
}

// =============================================================================
// Properties 3, 4, 6: full session runs
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_newer_secure_offer_emits_once(
        (identity, newer) in arb_identity_with_newer(),
        scoped in any::<bool>(),
    ) {
        let key = if scoped { identity.application_scope_key() } else { identity.generic_scope_key() };
        let body = manifest_body(&key, &newer, "https://foo.bar/");

        let (outcome, events) = run_check(identity, ServerResponse::ok(200, body));

        prop_assert_eq!(outcome.error_message(), "");
        prop_assert_eq!(events, vec!["https://foo.bar/".to_string()]);
    }

    #[test]
    fn prop_newer_insecure_offer_rejected(
        (identity, newer) in arb_identity_with_newer(),
        url in arb_insecure_url(),
    ) {
        let body = manifest_body(&identity.name, &newer, &url);

        let (outcome, events) = run_check(identity, ServerResponse::ok(200, body));

        prop_assert!(!outcome.error_message().is_empty());
        prop_assert!(events.is_empty());
    }

    #[test]
    fn prop_transport_failure_ignores_body(
        (identity, newer) in arb_identity_with_newer(),
        description in "[a-z ]{1,20}",
    ) {
        let mut response = ServerResponse::failed(description);
        response.response_text = manifest_body(&identity.name, &newer, "https://foo.bar/");

        let (outcome, events) = run_check(identity, response);

        prop_assert!(outcome.error().is_some_and(|e| e.is_transport_failure()));
        prop_assert!(events.is_empty());
    }
}
