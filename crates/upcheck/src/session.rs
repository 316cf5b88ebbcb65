//! One update check, from request URL to outcome.
//!
//! `UpdateCheckSession` builds the request URL, submits it through the
//! transport and feeds the response through manifest parsing, offer
//! selection and the security gate. An accepted offer is announced to every
//! registered listener before the outcome is returned.
//!
//! # States
//!
//! ```text
//! Idle ──run──▶ Requesting ──▶ Succeeded | Failed
//! ```
//!
//! At most one check can be `Requesting`; a second `run` while one is in
//! flight is rejected with `CheckInProgress` and leaves the state alone.
//! Terminal states accept a new `run`. There is no timeout here: a request
//! that never answers keeps the session in `Requesting` until the caller
//! drops the `run` future, which leaves the session `Failed`.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::UpdateError;
use crate::events::ListenerRegistry;
use crate::identity::AppIdentity;
use crate::manifest::UpdateManifest;
use crate::platform::EnvironmentInfo;
use crate::prefs::PreferenceStore;
use crate::rollout::RolloutState;
use crate::security::SecurityGate;
use crate::selector::{OfferSelector, UpdateOffer};
use crate::transport::{Transport, WebRequest};
use crate::url_builder::{CheckTrigger, UrlBuilder};

/// Error recorded when a `run` future is dropped before it finishes.
pub const CHECK_CANCELLED: &str = "update check cancelled";

/// Callback receiving the completion error string, empty on success.
pub type CompletionCallback = Box<dyn FnOnce(String) + Send + 'static>;

/// Current state of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No check has run yet
    #[default]
    Idle,
    /// Waiting for the transport's response
    Requesting,
    /// Response processed: update found, no update, or insecure offer rejected
    Succeeded,
    /// Request, preference lookup or manifest parsing failed
    Failed(String),
}

/// Result of one check.
#[derive(Debug)]
pub enum CheckOutcome {
    /// A newer, secure offer was accepted and announced to listeners
    UpdateAvailable(UpdateOffer),
    /// Nothing applicable or nothing newer
    NoUpdate,
    /// The check produced an error; no event was emitted
    Failed(UpdateError),
}

impl CheckOutcome {
    pub fn offer(&self) -> Option<&UpdateOffer> {
        match self {
            CheckOutcome::UpdateAvailable(offer) => Some(offer),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&UpdateError> {
        match self {
            CheckOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// Error string handed to completion callbacks, empty when there is none.
    pub fn error_message(&self) -> String {
        self.error().map(ToString::to_string).unwrap_or_default()
    }

    fn session_state(&self) -> SessionState {
        match self {
            CheckOutcome::UpdateAvailable(_) | CheckOutcome::NoUpdate => SessionState::Succeeded,
            // an insecure offer is a processed response, not a failed request
            CheckOutcome::Failed(UpdateError::InsecureUrl(_)) => SessionState::Succeeded,
            CheckOutcome::Failed(err) => SessionState::Failed(err.to_string()),
        }
    }
}

/// Runs update checks for one identity.
pub struct UpdateCheckSession {
    identity: AppIdentity,
    prefs: Arc<dyn PreferenceStore>,
    environment: Arc<dyn EnvironmentInfo>,
    transport: Arc<dyn Transport>,
    url_builder: UrlBuilder,
    selector: OfferSelector,
    gate: SecurityGate,
    listeners: Arc<ListenerRegistry>,
    state: RwLock<SessionState>,
}

impl UpdateCheckSession {
    pub fn new(
        identity: AppIdentity,
        prefs: Arc<dyn PreferenceStore>,
        environment: Arc<dyn EnvironmentInfo>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            identity,
            prefs,
            environment,
            transport,
            url_builder: UrlBuilder::default(),
            selector: OfferSelector,
            gate: SecurityGate,
            listeners: Arc::new(ListenerRegistry::new()),
            state: RwLock::new(SessionState::Idle),
        }
    }

    /// Use a URL builder with custom `%TYPE%` codes.
    pub fn with_url_builder(mut self, url_builder: UrlBuilder) -> Self {
        self.url_builder = url_builder;
        self
    }

    /// Share a listener registry with other components.
    pub fn with_listeners(mut self, listeners: Arc<ListenerRegistry>) -> Self {
        self.listeners = listeners;
        self
    }

    pub fn identity(&self) -> &AppIdentity {
        &self.identity
    }

    pub fn listeners(&self) -> &Arc<ListenerRegistry> {
        &self.listeners
    }

    /// Get the current state of the session.
    pub fn state(&self) -> SessionState {
        self.state.read().clone()
    }

    /// Whether a check is waiting for its response.
    pub fn is_requesting(&self) -> bool {
        *self.state.read() == SessionState::Requesting
    }

    /// Render the request URL this session would use.
    pub fn request_url(
        &self,
        rollout: &RolloutState,
        trigger: CheckTrigger,
    ) -> Result<String, UpdateError> {
        let template = UrlBuilder::template(self.prefs.as_ref(), &self.identity)?;
        Ok(self.url_builder.build(
            &template,
            &self.identity,
            self.environment.as_ref(),
            rollout,
            trigger,
        ))
    }

    /// Run one check and wait for its outcome.
    pub async fn run(&self, trigger: CheckTrigger, rollout: &RolloutState) -> CheckOutcome {
        let Some(guard) = RequestingGuard::acquire(&self.state) else {
            warn!(%trigger, "Update check already in progress, rejecting");
            return CheckOutcome::Failed(UpdateError::CheckInProgress);
        };

        info!(%trigger, name = %self.identity.name, "Checking for updates...");
        let outcome = self.execute(trigger, rollout).await;

        match &outcome {
            CheckOutcome::UpdateAvailable(offer) => {
                info!(
                    current = %self.identity.version,
                    version = %offer.version,
                    url = %offer.url,
                    "Update available"
                );
                self.listeners.emit(&offer.url);
            }
            CheckOutcome::NoUpdate => {
                info!(current = %self.identity.version, "No update available");
            }
            CheckOutcome::Failed(err) => {
                error!(error = %err, "Update check failed");
            }
        }

        guard.finish(outcome.session_state());
        outcome
    }

    /// Run a check in the background and report through `on_complete`.
    ///
    /// Returns as soon as the check is spawned. Listeners are notified
    /// before `on_complete` runs. Must be called within a tokio runtime.
    pub fn start(
        self: &Arc<Self>,
        trigger: CheckTrigger,
        rollout: RolloutState,
        on_complete: CompletionCallback,
    ) -> JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = session.run(trigger, &rollout).await;
            on_complete(outcome.error_message());
        })
    }

    async fn execute(&self, trigger: CheckTrigger, rollout: &RolloutState) -> CheckOutcome {
        let url = match self.request_url(rollout, trigger) {
            Ok(url) => url,
            Err(e) => return CheckOutcome::Failed(e),
        };
        debug!(url = %url, "Built update check URL");

        let request = match WebRequest::new(url) {
            Ok(request) => request,
            Err(e) => return CheckOutcome::Failed(e),
        };

        let body = match self.transport.get(request).await.into_body() {
            Ok(body) => body,
            Err(e) => return CheckOutcome::Failed(e),
        };

        let manifest = match UpdateManifest::parse(&body) {
            Ok(manifest) => manifest,
            Err(e) => return CheckOutcome::Failed(e),
        };

        let Some(offer) = self.selector.select(&manifest, &self.identity) else {
            return CheckOutcome::NoUpdate;
        };

        match self.gate.check(offer) {
            Ok(offer) => CheckOutcome::UpdateAvailable(offer),
            Err(e) => CheckOutcome::Failed(e),
        }
    }
}

/// Holds the session in `Requesting` and marks it `Failed` if dropped
/// before `finish`.
struct RequestingGuard<'a> {
    state: &'a RwLock<SessionState>,
    finished: bool,
}

impl<'a> RequestingGuard<'a> {
    fn acquire(state: &'a RwLock<SessionState>) -> Option<Self> {
        let mut current = state.write();
        if *current == SessionState::Requesting {
            return None;
        }
        *current = SessionState::Requesting;
        Some(Self {
            state,
            finished: false,
        })
    }

    fn finish(mut self, next: SessionState) {
        *self.state.write() = next;
        self.finished = true;
    }
}

impl Drop for RequestingGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("Update check dropped before completion");
            *self.state.write() = SessionState::Failed(CHECK_CANCELLED.to_string());
        }
    }
}

impl std::fmt::Debug for UpdateCheckSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateCheckSession")
            .field("identity", &self.identity)
            .field("url_builder", &self.url_builder)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}
