//! Cache Backend Trait
//!
//! The operations the coherence layer needs from a key-value cache service.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

/// Key-value cache service with per-entry TTL.
///
/// Errors are reported as `ServiceError::CacheUnavailable`.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value, expiring after `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Removes the given keys and returns how many existed.
    async fn delete(&self, keys: &[String]) -> Result<usize>;

    /// Lists the live keys starting with `prefix`.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>>;
}
