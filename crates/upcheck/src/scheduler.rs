//! Update scheduler.
//!
//! Owns the rollout counters and decides when checks run. Manual checks are
//! started with [`UpdateScheduler::force_check`] and report through a
//! completion callback. Automatic checks run on a timer: the first one after
//! the persisted `next_check` time (or the configured initial delay), then
//! once per check interval.
//!
//! Only one check is ever in flight. A manual check that overlaps another is
//! rejected with `CheckInProgress`; an automatic check that overlaps is
//! skipped and the next one is scheduled as usual.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{ScheduleConfig, UpdaterConfig};
use crate::error::UpdateError;
use crate::events::ListenerHandle;
use crate::rollout::{PersistedState, RolloutState};
use crate::session::{CheckOutcome, UpdateCheckSession};
use crate::timer::{Timer, TokioTimer};
use crate::url_builder::CheckTrigger;

struct SchedulerInner {
    session: Arc<UpdateCheckSession>,
    schedule: ScheduleConfig,
    state_path: Option<PathBuf>,
    state: RwLock<PersistedState>,
    timer: Arc<dyn Timer>,
    runtime: Mutex<Option<Handle>>,
    // held from request to rollout update so no check reads stale counters
    in_flight: tokio::sync::Mutex<()>,
    running: AtomicBool,
    // bumped by stop() so timers armed earlier fire into nothing
    generation: AtomicU64,
}

/// Schedules update checks and keeps rollout state.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct UpdateScheduler {
    inner: Arc<SchedulerInner>,
}

impl UpdateScheduler {
    /// Create a scheduler driven by tokio timers.
    ///
    /// Loads persisted state from `config.state_path` when set.
    pub fn new(session: Arc<UpdateCheckSession>, config: &UpdaterConfig) -> Result<Self, UpdateError> {
        Self::with_timer(session, config, Arc::new(TokioTimer::new()))
    }

    /// Create a scheduler with a custom timer.
    pub fn with_timer(
        session: Arc<UpdateCheckSession>,
        config: &UpdaterConfig,
        timer: Arc<dyn Timer>,
    ) -> Result<Self, UpdateError> {
        config.validate()?;

        let state = match &config.state_path {
            Some(path) => {
                let state = PersistedState::load(path)?;
                debug!(
                    path = %path.display(),
                    last_version = %state.rollout.last_version,
                    download_count = state.rollout.download_count,
                    "Loaded update state"
                );
                state
            }
            None => PersistedState::default(),
        };

        Ok(Self {
            inner: Arc::new(SchedulerInner {
                session,
                schedule: config.schedule.clone(),
                state_path: config.state_path.clone(),
                state: RwLock::new(state),
                timer,
                runtime: Mutex::new(None),
                in_flight: tokio::sync::Mutex::new(()),
                running: AtomicBool::new(false),
                generation: AtomicU64::new(0),
            }),
        })
    }

    pub fn session(&self) -> &Arc<UpdateCheckSession> {
        &self.inner.session
    }

    /// Current rollout counters.
    pub fn rollout_state(&self) -> RolloutState {
        self.inner.state.read().rollout.clone()
    }

    /// Full persisted state, check times included.
    pub fn persisted_state(&self) -> PersistedState {
        self.inner.state.read().clone()
    }

    /// When the next automatic check is due, if one has been scheduled.
    pub fn next_check(&self) -> Option<DateTime<Utc>> {
        self.inner.state.read().next_check
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    /// Register an "update available" listener.
    pub fn add_update_listener<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.inner.session.listeners().add(listener)
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn remove_update_listener(&self, handle: ListenerHandle) -> bool {
        self.inner.session.listeners().remove(handle)
    }

    /// Run one check and record its result.
    ///
    /// On an accepted offer the rollout counters advance before this
    /// returns, so the next request already reports them.
    pub async fn check(&self, trigger: CheckTrigger) -> CheckOutcome {
        let Ok(_in_flight) = self.inner.in_flight.try_lock() else {
            warn!(%trigger, "Update check already in progress, rejecting");
            return CheckOutcome::Failed(UpdateError::CheckInProgress);
        };

        let rollout = self.rollout_state();
        let outcome = self.inner.session.run(trigger, &rollout).await;

        if matches!(outcome, CheckOutcome::Failed(UpdateError::CheckInProgress)) {
            return outcome;
        }

        {
            let mut state = self.inner.state.write();
            state.last_check = Some(Utc::now());
            if let CheckOutcome::UpdateAvailable(offer) = &outcome {
                state.rollout.record_offer(offer);
                debug!(
                    last_version = %state.rollout.last_version,
                    download_count = state.rollout.download_count,
                    "Rollout state updated"
                );
            }
        }
        self.persist();

        outcome
    }

    /// Start a manual check without waiting for it.
    ///
    /// `on_complete` receives an empty string on success, the error message
    /// otherwise. Listeners are notified before it runs. Must be called
    /// within a tokio runtime.
    pub fn force_check<F>(&self, on_complete: F) -> JoinHandle<()>
    where
        F: FnOnce(String) + Send + 'static,
    {
        let scheduler = self.clone();
        tokio::spawn(async move {
            let outcome = scheduler.check(CheckTrigger::Manual).await;
            on_complete(outcome.error_message());
        })
    }

    /// Begin automatic checks.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when called outside a tokio runtime.
    pub fn start(&self) -> Result<(), UpdateError> {
        if !self.inner.schedule.enabled {
            info!("Automatic update checks disabled");
            return Ok(());
        }

        let handle = Handle::try_current().map_err(|_| {
            UpdateError::ConfigError("automatic checks require a tokio runtime".to_string())
        })?;
        *self.inner.runtime.lock() = Some(handle);

        if self.inner.running.swap(true, Ordering::SeqCst) {
            debug!("Scheduler already running");
            return Ok(());
        }

        let delay = match self.next_check() {
            Some(due) => (due - Utc::now()).to_std().unwrap_or(Duration::ZERO),
            None => self.inner.schedule.initial_delay(),
        };
        info!(delay_secs = delay.as_secs(), "Scheduling first automatic update check");
        self.arm(delay);
        Ok(())
    }

    /// Stop automatic checks. A check already in flight runs to completion.
    pub fn stop(&self) {
        if self.inner.running.swap(false, Ordering::SeqCst) {
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            self.inner.timer.cancel_all();
            info!("Automatic update checks stopped");
        }
    }

    fn arm(&self, delay: Duration) {
        let generation = self.inner.generation.load(Ordering::SeqCst);
        let scheduler = self.clone();
        self.inner.timer.schedule_once(
            delay,
            Box::new(move || {
                if !scheduler.is_armed(generation) {
                    return;
                }
                let Some(runtime) = scheduler.inner.runtime.lock().clone() else {
                    return;
                };
                runtime.spawn(async move { scheduler.run_automatic().await });
            }),
        );
    }

    fn is_armed(&self, generation: u64) -> bool {
        self.is_running() && self.inner.generation.load(Ordering::SeqCst) == generation
    }

    async fn run_automatic(&self) {
        let generation = self.inner.generation.load(Ordering::SeqCst);
        let outcome = self.check(CheckTrigger::Automatic).await;
        if matches!(outcome, CheckOutcome::Failed(UpdateError::CheckInProgress)) {
            info!("Skipping automatic update check, another check is in flight");
        }

        let delay = self.next_delay();
        let due = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d));
        self.inner.state.write().next_check = due;
        self.persist();

        if self.is_armed(generation) {
            debug!(delay_secs = delay.as_secs(), "Scheduling next automatic update check");
            self.arm(delay);
        }
    }

    fn next_delay(&self) -> Duration {
        let jitter = match self.inner.schedule.jitter_secs {
            0 => 0,
            max => rand::thread_rng().gen_range(0..=max),
        };
        self.inner.schedule.check_interval() + Duration::from_secs(jitter)
    }

    fn persist(&self) {
        let Some(path) = &self.inner.state_path else {
            return;
        };
        let state = self.inner.state.read().clone();
        if let Err(e) = state.save(path) {
            warn!(path = %path.display(), error = %e, "Failed to persist update state");
        }
    }
}

impl std::fmt::Debug for UpdateScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateScheduler")
            .field("schedule", &self.inner.schedule)
            .field("state", &*self.inner.state.read())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
