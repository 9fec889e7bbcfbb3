//! Expired Entry Cleanup Task
//!
//! Background task that reclaims expired entries from stores that only
//! expire lazily.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::backend::CacheBackend;

/// Spawns a background task that periodically purges expired entries.
///
/// # Returns
/// A JoinHandle for the spawned task, aborted during shutdown.
pub fn spawn_cleanup_task(backend: Arc<dyn CacheBackend>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting expired entry cleanup with interval of {} seconds",
            interval.as_secs_f64()
        );

        loop {
            tokio::time::sleep(interval).await;

            match backend.purge_expired().await {
                Ok(0) => debug!("Cleanup: no expired entries found"),
                Ok(removed) => info!("Cleanup: removed {} expired entries", removed),
                Err(e) => warn!("Expired entry cleanup failed: {}", e),
            }
        }
    })
}
