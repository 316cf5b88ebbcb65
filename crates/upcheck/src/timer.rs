//! One-shot timer used to wait between automatic checks.

use std::time::Duration;

use tokio::task::JoinHandle;

/// Callback fired when a timer elapses.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Schedules a callback to run once after a delay.
pub trait Timer: Send + Sync {
    fn schedule_once(&self, delay: Duration, callback: TimerCallback);

    /// Drop every callback that has not fired yet.
    fn cancel_all(&self);
}

/// Timer backed by the tokio runtime.
///
/// Must be used from within a runtime context.
#[derive(Debug, Default)]
pub struct TokioTimer {
    tasks: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl TokioTimer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Timer for TokioTimer {
    fn schedule_once(&self, delay: Duration, callback: TimerCallback) {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });

        let mut tasks = self.tasks.lock();
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
    }

    fn cancel_all(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
