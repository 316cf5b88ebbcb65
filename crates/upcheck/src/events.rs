//! "Update available" listeners.
//!
//! Listeners are registered explicitly and receive the accepted offer's
//! download URL. Registration returns a handle that can remove the listener
//! again. No ordering between listeners is guaranteed.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

/// Name of the event delivered to listeners.
pub const UPDATE_AVAILABLE_EVENT: &str = "updateAvailable";

/// Callback invoked with the download URL of an accepted offer.
pub type UpdateListener = Arc<dyn Fn(&str) + Send + Sync>;

/// Handle identifying a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(u64);

/// Set of "update available" listeners.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: RwLock<HashMap<ListenerHandle, UpdateListener>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn add<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let handle = ListenerHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().insert(handle, Arc::new(listener));
        handle
    }

    /// Remove a listener. Returns false if the handle was unknown.
    pub fn remove(&self, handle: ListenerHandle) -> bool {
        self.listeners.write().remove(&handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }

    /// Deliver `url` to every registered listener.
    ///
    /// Listeners are called outside the lock, so they may add or remove
    /// listeners themselves. A panicking listener is logged and skipped.
    pub fn emit(&self, url: &str) {
        let listeners: Vec<UpdateListener> = self.listeners.read().values().cloned().collect();
        tracing::debug!(
            event = UPDATE_AVAILABLE_EVENT,
            listeners = listeners.len(),
            "Emitting event"
        );
        for listener in listeners {
            if panic::catch_unwind(AssertUnwindSafe(|| listener(url))).is_err() {
                tracing::error!(event = UPDATE_AVAILABLE_EVENT, "Update listener panicked");
            }
        }
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}
