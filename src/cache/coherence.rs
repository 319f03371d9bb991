//! Cache coherence layer
//!
//! Cache-aside reads and family-wide invalidation on top of a `CacheBackend`.
//!
//! Reads look up the canonical key for `(operation, args)`; on a miss they load
//! from the store and write the serialized result back with the configured TTL.
//! Writes call [`CoherentCache::invalidate_all`] for every read family they can
//! affect, which removes all keys of those families regardless of arguments.
//!
//! The cache is never allowed to fail a request. Lookup errors degrade to a
//! store read, population errors are dropped, and invalidation errors are
//! logged and counted, leaving stale entries until their TTL runs out.
//!
//! A per-family generation counter keeps a read that loaded data before a
//! concurrent invalidation from writing that pre-write result back.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::cache::{CacheBackend, CacheCounters, CacheKey, CacheStats, KeySpace};
use crate::error::{Result, ServiceError};

/// Whether a read was answered from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    /// Value of the `X-Users-Cache` response header.
    pub fn as_header_value(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "Hit",
            CacheStatus::Miss => "Miss",
        }
    }
}

/// A read result together with where it came from.
#[derive(Debug, Clone)]
pub struct Cached<T> {
    pub value: T,
    pub status: CacheStatus,
}

pub struct CoherentCache {
    backend: Arc<dyn CacheBackend>,
    keys: KeySpace,
    ttl: Duration,
    timeout: Duration,
    counters: CacheCounters,
    generations: Mutex<HashMap<String, u64>>,
}

impl CoherentCache {
    pub fn new(
        backend: Arc<dyn CacheBackend>,
        keys: KeySpace,
        ttl: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            keys,
            ttl,
            timeout,
            counters: CacheCounters::new(),
            generations: Mutex::new(HashMap::new()),
        }
    }

    /// Serves `operation(args)` from the cache, or runs `load` and caches its result.
    ///
    /// Only successful loads are cached; an error from `load` is returned as is.
    pub async fn cached_read<T, F, Fut>(
        &self,
        operation: &str,
        args: &[(&str, Option<String>)],
        load: F,
    ) -> Result<Cached<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let key = self.keys.key(operation, args);

        match self.bounded(self.backend.get(key.as_str())).await {
            Ok(Some(raw)) => match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    self.counters.record_hit();
                    debug!(key = %key, "Cache hit");
                    return Ok(Cached {
                        value,
                        status: CacheStatus::Hit,
                    });
                }
                Err(err) => warn!(key = %key, error = %err, "Discarding undecodable cache entry"),
            },
            Ok(None) => {}
            Err(err) => warn!(key = %key, error = %err, "Cache lookup failed, reading from store"),
        }

        self.counters.record_miss();
        debug!(key = %key, "Cache miss");

        let generation = self.generation(operation);
        let value = load().await?;
        self.populate(operation, generation, &key, &value).await;

        Ok(Cached {
            value,
            status: CacheStatus::Miss,
        })
    }

    async fn populate<T: Serialize>(
        &self,
        operation: &str,
        generation: u64,
        key: &CacheKey,
        value: &T,
    ) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key = %key, error = %err, "Could not serialize read result for caching");
                return;
            }
        };

        if self.generation(operation) != generation {
            debug!(key = %key, "Family invalidated during load, not caching");
            return;
        }

        if let Err(err) = self
            .bounded(self.backend.set(key.as_str(), raw, self.ttl))
            .await
        {
            warn!(key = %key, error = %err, "Failed to populate cache");
            return;
        }

        // An invalidation may have swept the family between the check and the set
        if self.generation(operation) != generation {
            if let Err(err) = self
                .bounded(self.backend.delete(&[key.to_string()]))
                .await
            {
                warn!(key = %key, error = %err, "Failed to retract stale cache entry");
            }
        }
    }

    /// Removes every cached entry of `family`, whatever its arguments.
    ///
    /// Returns the number of entries removed.
    pub async fn invalidate(&self, family: &str) -> Result<usize> {
        self.bump_generation(family);

        let prefix = self.keys.family_prefix(family);
        let keys = self.bounded(self.backend.scan_prefix(&prefix)).await?;
        if keys.is_empty() {
            return Ok(0);
        }

        let removed = self.bounded(self.backend.delete(&keys)).await?;
        self.counters.record_invalidations(removed);
        Ok(removed)
    }

    /// Invalidates each family in turn, absorbing failures.
    ///
    /// Called on the commit path of every write, after the store mutation and
    /// before the response.
    pub async fn invalidate_all(&self, families: &[&str]) {
        for family in families {
            match self.invalidate(family).await {
                Ok(removed) => debug!(family = %family, removed, "Cache family invalidated"),
                Err(err) => {
                    self.counters.record_invalidation_failure();
                    warn!(
                        family = %family,
                        error = %err,
                        ttl_secs = self.ttl.as_secs(),
                        "Cache invalidation failed, entries may be stale until TTL expiry"
                    );
                }
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                ServiceError::CacheUnavailable(format!(
                    "cache call timed out after {}ms",
                    self.timeout.as_millis()
                ))
            })?
    }

    fn generation(&self, family: &str) -> u64 {
        let generations = self
            .generations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        generations.get(family).copied().unwrap_or(0)
    }

    fn bump_generation(&self, family: &str) {
        let mut generations = self
            .generations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *generations.entry(family.to_string()).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TTL: Duration = Duration::from_secs(30);

    fn coherent(backend: MemoryCache) -> CoherentCache {
        CoherentCache::new(
            Arc::new(backend),
            KeySpace::new("test_cache", "users"),
            TTL,
            Duration::from_secs(1),
        )
    }

    fn arg(value: &str) -> Vec<(&'static str, Option<String>)> {
        vec![("email", Some(value.to_string()))]
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let cache = coherent(MemoryCache::new(100));
        let loads = AtomicUsize::new(0);

        for expected in [CacheStatus::Miss, CacheStatus::Hit, CacheStatus::Hit] {
            let read = cache
                .cached_read("filter_users", &arg("a"), || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![1, 2, 3])
                })
                .await
                .unwrap();
            assert_eq!(read.status, expected);
            assert_eq!(read.value, vec![1, 2, 3]);
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses), (2, 1));
    }

    #[tokio::test]
    async fn test_failed_load_is_not_cached() {
        let backend = MemoryCache::new(100);
        let cache = coherent(backend.clone());

        let result: Result<Cached<u32>> = cache
            .cached_read("get_user", &arg("x"), || async { Err(ServiceError::NotFound) })
            .await;

        assert!(matches!(result, Err(ServiceError::NotFound)));
        assert_eq!(backend.len().await, 0);
    }

    #[tokio::test]
    async fn test_invalidate_removes_whole_family_only() {
        let backend = MemoryCache::new(100);
        let cache = coherent(backend.clone());

        for email in ["a", "b", "c"] {
            cache
                .cached_read("filter_users", &arg(email), || async { Ok(1u8) })
                .await
                .unwrap();
        }
        cache
            .cached_read("get_user", &arg("a"), || async { Ok(1u8) })
            .await
            .unwrap();

        let removed = cache.invalidate("filter_users").await.unwrap();
        assert_eq!(removed, 3);
        assert_eq!(backend.len().await, 1);
        assert_eq!(cache.stats().invalidations, 3);

        let read = cache
            .cached_read("get_user", &arg("a"), || async { Ok(2u8) })
            .await
            .unwrap();
        assert_eq!(read.status, CacheStatus::Hit);
        assert_eq!(read.value, 1);
    }

    #[tokio::test]
    async fn test_read_after_invalidation_sees_fresh_value() {
        let cache = coherent(MemoryCache::new(100));

        cache
            .cached_read("filter_users", &[], || async { Ok("old".to_string()) })
            .await
            .unwrap();
        cache.invalidate_all(&["filter_users"]).await;

        let read = cache
            .cached_read("filter_users", &[], || async { Ok("new".to_string()) })
            .await
            .unwrap();
        assert_eq!(read.status, CacheStatus::Miss);
        assert_eq!(read.value, "new");
    }

    #[tokio::test]
    async fn test_load_overlapping_invalidation_is_not_cached() {
        let backend = MemoryCache::new(100);
        let cache = coherent(backend.clone());

        let read = cache
            .cached_read("filter_users", &[], || async {
                // A write commits and invalidates while this read is loading
                cache.invalidate_all(&["filter_users"]).await;
                Ok("pre-write".to_string())
            })
            .await
            .unwrap();

        assert_eq!(read.value, "pre-write");
        assert_eq!(backend.len().await, 0);
    }

    #[tokio::test]
    async fn test_cache_outage_degrades_to_store() {
        let backend = MemoryCache::new(100);
        let cache = coherent(backend.clone());
        backend.set_available(false);

        let read = cache
            .cached_read("get_user", &arg("a"), || async { Ok(5u8) })
            .await
            .unwrap();
        assert_eq!(read.value, 5);
        assert_eq!(read.status, CacheStatus::Miss);

        cache.invalidate_all(&["get_user", "filter_users"]).await;
        assert_eq!(cache.stats().invalidation_failures, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = coherent(MemoryCache::new(100));

        cache
            .cached_read("get_user", &arg("a"), || async { Ok(1u8) })
            .await
            .unwrap();

        tokio::time::advance(TTL - Duration::from_secs(1)).await;
        let read = cache
            .cached_read("get_user", &arg("a"), || async { Ok(2u8) })
            .await
            .unwrap();
        assert_eq!((read.status, read.value), (CacheStatus::Hit, 1));

        tokio::time::advance(Duration::from_secs(1)).await;
        let read = cache
            .cached_read("get_user", &arg("a"), || async { Ok(2u8) })
            .await
            .unwrap();
        assert_eq!((read.status, read.value), (CacheStatus::Miss, 2));
    }
}
