//! Periodic expiry sweep.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::config::DEFAULT_SWEEP_INTERVAL;
use super::store::NonceStore;

/// Background task that asks the store to drop stale entries every
/// `interval`. The task is aborted when the `Sweeper` is dropped.
pub struct Sweeper {
    task: JoinHandle<()>,
}

impl Sweeper {
    /// Starts sweeping `store` on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(store: NonceStore, interval: Duration, ttl: Duration) -> Self {
        let interval = if interval.is_zero() {
            warn!("zero sweep interval, using the default");
            DEFAULT_SWEEP_INTERVAL
        } else {
            interval
        };

        let task = tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), ttl_secs = ttl.as_secs(), "nonce sweeper started");
            let mut ticker = tokio::time::interval(interval);

            // The first tick completes immediately; sweep only after a full
            // interval has passed.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if store.sweep(ttl).await.is_err() {
                    debug!("nonce store closed, sweeper exiting");
                    return;
                }
            }
        });

        Self { task }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.task.abort();
    }
}
