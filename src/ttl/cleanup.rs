//! Periodic cleanup of expired entries.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::engine::TtlStore;

/// A periodic cleanup job, built by
/// [`TtlStore::cleanup_job`](super::TtlStore::cleanup_job) and started
/// with [`spawn`](Self::spawn).
pub struct CleanupJob {
    store: TtlStore,
    interval: Duration,
}

impl CleanupJob {
    pub(crate) fn new(store: TtlStore, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// The sweep interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start the cleanup loop on the current runtime.
    ///
    /// Each tick reads the state, computes the expired set, and issues
    /// at most one state update removing it. Sweep errors are logged
    /// and swallowed; the loop runs until the returned handle stops it.
    pub fn spawn(self) -> CleanupHandle {
        let Self { store, interval } = self;
        debug!(store = %store.name(), interval = ?interval, "Starting cleanup loop");

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match store.remove_expired_now().await {
                    Ok(0) => {}
                    Ok(removed) => {
                        debug!(store = %store.name(), removed, "Cleanup removed expired entries");
                    }
                    Err(e) => {
                        warn!(store = %store.name(), error = %e, "Cleanup sweep failed");
                    }
                }
            }
        });

        CleanupHandle { handle }
    }
}

/// Handle to a running cleanup loop. Dropping the handle stops the
/// loop; so does [`stop`](Self::stop).
pub struct CleanupHandle {
    handle: JoinHandle<()>,
}

impl CleanupHandle {
    /// Cancel the loop. Takes effect at the next suspension point; a
    /// sweep's file replacement, once begun, still completes.
    pub fn stop(&self) {
        self.handle.abort();
    }

    /// Whether the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for CleanupHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
