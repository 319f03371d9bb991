//! In-process cache backend
//!
//! Wraps `CacheStore` in a shared lock so it can stand in for the cache
//! service when no Redis URL is configured, and in tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::{CacheBackend, CacheStore};
use crate::error::{Result, ServiceError};

/// Cache backend held in process memory.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    store: Arc<RwLock<CacheStore>>,
    available: Arc<AtomicBool>,
}

impl MemoryCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            store: Arc::new(RwLock::new(CacheStore::new(max_entries))),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Shared handle to the underlying store, for the cleanup task.
    pub fn store(&self) -> Arc<RwLock<CacheStore>> {
        self.store.clone()
    }

    /// Makes every operation fail with `CacheUnavailable` while `false`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Current number of stored entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ServiceError::CacheUnavailable(
                "in-memory cache is offline".to_string(),
            ))
        }
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check_available()?;
        Ok(self.store.write().await.get(key))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.check_available()?;
        self.store.write().await.set(key.to_string(), value, ttl);
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<usize> {
        self.check_available()?;
        let mut store = self.store.write().await;
        Ok(keys.iter().filter(|key| store.delete(key)).count())
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.check_available()?;
        Ok(self.store.read().await.keys_with_prefix(prefix))
    }
}
