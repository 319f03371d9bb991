//! Cache Store Module
//!
//! In-memory cache engine: HashMap storage with TTL expiration, prefix scans
//! and bounded capacity.

use std::collections::HashMap;
use std::time::Duration;

use crate::cache::CacheEntry;

// == Cache Store ==
/// In-memory key-value storage with per-entry TTL.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// Entries dropped to stay within capacity
    evictions: u64,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore with the given capacity.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries: max_entries.max(1),
            evictions: 0,
        }
    }

    // == Set ==
    /// Stores a key-value pair expiring after `ttl`.
    ///
    /// If the key already exists, the value is overwritten and TTL is reset.
    /// If the cache is at capacity, expired entries are dropped first, then the
    /// entry closest to expiry.
    pub fn set(&mut self, key: String, value: String, ttl: Duration) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.cleanup_expired();
            if self.entries.len() >= self.max_entries {
                self.evict_soonest_expiring();
            }
        }

        self.entries.insert(key, CacheEntry::new(value, ttl));
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Expired entries are removed and reported as absent.
    pub fn get(&mut self, key: &str) -> Option<String> {
        match self.entries.get(key) {
            Some(entry) if entry.is_expired() => {
                self.entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    // == Delete ==
    /// Removes an entry by key. Returns true if a live entry was removed.
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries
            .remove(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    // == Keys With Prefix ==
    /// Returns the live keys starting with `prefix`.
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && !entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect()
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        before - self.entries.len()
    }

    fn evict_soonest_expiring(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.expires_at)
            .map(|(key, _)| key.clone());

        if let Some(key) = victim {
            self.entries.remove(&key);
            self.evictions += 1;
        }
    }

    /// Number of entries dropped to respect capacity.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
