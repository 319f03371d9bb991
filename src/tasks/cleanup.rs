//! TTL Cleanup Task
//!
//! Background task that periodically removes expired entries from the
//! in-memory cache. Redis expires entries on its own.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::CacheStore;

/// Spawns a background task that periodically cleans up expired cache entries.
///
/// Expired entries are never served either way; the sweep only bounds memory.
///
/// # Arguments
/// * `cache` - shared in-memory cache store
/// * `cleanup_interval_secs` - Interval in seconds between cleanup runs
///
/// # Returns
/// A JoinHandle for the spawned task, used to abort it on shutdown.
pub fn spawn_cleanup_task(
    cache: Arc<RwLock<CacheStore>>,
    cleanup_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting cache TTL cleanup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let (removed, evictions) = {
                let mut cache_guard = cache.write().await;
                (cache_guard.cleanup_expired(), cache_guard.evictions())
            };

            if removed > 0 {
                info!(removed, evictions, "Cache TTL cleanup removed expired entries");
            } else {
                debug!("Cache TTL cleanup: no expired entries found");
            }
        }
    })
}
