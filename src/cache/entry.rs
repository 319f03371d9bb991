//! Cache Entry Module
//!
//! Defines the structure for individual in-memory cache entries with TTL support.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::MAX_CACHE_TTL_SECS;

// == Cache Entry ==
/// Represents a single cache entry with value and expiry deadline.
///
/// Times come from `tokio::time::Instant` so paused-clock tests can drive expiry.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The stored value
    pub value: String,
    /// When the entry stops being served
    pub expires_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl` from now.
    ///
    /// A `ttl` past the clock's range is capped at `MAX_CACHE_TTL_SECS`.
    pub fn new(value: String, ttl: Duration) -> Self {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .unwrap_or_else(|| now + Duration::from_secs(MAX_CACHE_TTL_SECS));
        Self { value, expires_at }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its deadline.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_creation() {
        let entry = CacheEntry::new("test_value".to_string(), Duration::from_secs(30));

        assert_eq!(entry.value, "test_value");
        assert!(!entry.is_expired());
        assert_eq!(entry.expires_at - Instant::now(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expiration() {
        let entry = CacheEntry::new("test_value".to_string(), Duration::from_secs(30));

        tokio::time::advance(Duration::from_secs(29)).await;
        assert!(!entry.is_expired());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(entry.is_expired(), "Entry should be expired at the deadline");
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_is_expired_immediately() {
        let entry = CacheEntry::new("test".to_string(), Duration::ZERO);
        assert!(entry.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_ttl_does_not_overflow() {
        let entry = CacheEntry::new("test".to_string(), Duration::MAX);
        assert!(!entry.is_expired());
        assert_eq!(
            entry.expires_at - Instant::now(),
            Duration::from_secs(MAX_CACHE_TTL_SECS)
        );
    }
}
