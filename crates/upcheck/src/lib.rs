//! # upcheck
//!
//! Update-check client for add-ons embedded in a host application.
//!
//! This crate handles:
//! - Building the templated update request URL from preferences, identity,
//!   platform and rollout counters
//! - Parsing the JSON update manifest
//! - Selecting the applicable, newer offer for the running identity
//! - Rejecting offers whose download URL is not HTTPS
//! - Running checks manually or on a timer, one at a time
//!
//! ## Flow
//!
//! ```text
//! UpdateScheduler ──▶ UpdateCheckSession ──▶ UrlBuilder ──▶ Transport
//!        ▲                    │
//!        │                    ▼
//!   RolloutState     UpdateManifest ──▶ OfferSelector ──▶ SecurityGate ──▶ listeners
//! ```
//!
//! Network access, preferences, platform information and timers are all
//! supplied through traits, so the whole pipeline can be driven from tests
//! with the helpers in [`testing`].

pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod manifest;
pub mod platform;
pub mod prefs;
#[cfg(test)]
mod proptests;
pub mod rollout;
pub mod scheduler;
pub mod security;
pub mod selector;
pub mod session;
pub mod testing;
pub mod timer;
pub mod transport;
pub mod url_builder;
pub mod version;

// Re-export main types for convenience
pub use config::{NetworkConfig, ScheduleConfig, UpdaterConfig};
pub use error::UpdateError;
pub use events::{ListenerHandle, ListenerRegistry, UpdateListener, UPDATE_AVAILABLE_EVENT};
pub use identity::AppIdentity;
pub use manifest::{ManifestEntry, UpdateManifest};
pub use platform::{current_platform, EnvironmentInfo, StaticEnvironment};
pub use prefs::{MemoryPreferences, PreferenceStore, UPDATE_URL_DEVBUILD, UPDATE_URL_RELEASE};
pub use rollout::{PersistedState, RolloutState};
pub use scheduler::UpdateScheduler;
pub use security::{is_secure_url, SecurityGate};
pub use selector::{OfferSelector, UpdateOffer};
pub use session::{
    CheckOutcome, CompletionCallback, SessionState, UpdateCheckSession, CHECK_CANCELLED,
};
pub use timer::{Timer, TimerCallback, TokioTimer};
pub use transport::{HttpTransport, ServerResponse, Transport, TransportStatus, WebRequest};
pub use url_builder::{CheckTrigger, CheckTypeCodes, UrlBuilder};
pub use version::{compare_versions, is_newer};
