//! Debounced background jobs.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Runs the most recently scheduled job after a quiet period.
///
/// Scheduling aborts the previous job, whether it is still waiting or
/// already running. Dropping the debouncer aborts the pending job.
#[derive(Debug)]
pub struct Debouncer {
    name: &'static str,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    /// Creates an idle debouncer. `name` shows up in logs.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            pending: Mutex::new(None),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Runs `job` after `delay` unless another job is scheduled first.
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, delay: Duration, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let name = self.name;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::trace!(job = name, "Running debounced job");
            job.await;
        });
        if let Some(previous) = self.slot().replace(handle) {
            previous.abort();
        }
    }

    /// Aborts the pending job, if any.
    pub fn cancel(&self) {
        if let Some(previous) = self.slot().take() {
            previous.abort();
        }
    }

    /// Whether a job is waiting or running.
    pub fn is_pending(&self) -> bool {
        self.slot().as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
