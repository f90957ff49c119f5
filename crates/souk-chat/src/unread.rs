//! Fixed-interval unread-count polling.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::warn;

/// Background task polling an unread count and reporting it to a callback.
///
/// The first poll fires immediately, then on the fixed interval. Dropping
/// the poller aborts the task; no timer outlives its owner.
pub struct UnreadPoller {
    task: Option<JoinHandle<()>>,
}

impl UnreadPoller {
    pub fn start<F, Fut, C>(interval: Duration, fetch: F, on_count: C) -> Self
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<u64, crate::ChatError>> + Send,
        C: Fn(u64) + Send + 'static,
    {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match fetch().await {
                    Ok(count) => on_count(count),
                    Err(e) => {
                        // A failed poll is not fatal; the next tick retries.
                        warn!(error = %e, "Unread count fetch failed");
                    }
                }
            }
        });

        Self { task: Some(task) }
    }

    /// Stop polling. Idempotent.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for UnreadPoller {
    fn drop(&mut self) {
        self.stop();
    }
}
