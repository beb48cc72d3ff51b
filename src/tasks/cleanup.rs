//! TTL Cleanup Task
//!
//! Background task that periodically purges expired entries from every
//! domain cache. Reads already treat expired entries as absent; this only
//! reclaims their memory early.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::services::Services;

/// Spawns a background task that periodically purges expired cache entries.
///
/// # Arguments
/// * `services` - Facades whose caches are purged
/// * `cleanup_interval_secs` - Interval in seconds between purge runs
///
/// # Returns
/// A JoinHandle for the spawned task, aborted during graceful shutdown.
pub fn spawn_cleanup_task(services: Services, cleanup_interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup task with interval of {} seconds",
            cleanup_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = services.purge_expired().await;
            if removed > 0 {
                info!("TTL cleanup: removed {} expired entries", removed);
            } else {
                debug!("TTL cleanup: no expired entries found");
            }
        }
    })
}
