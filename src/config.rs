//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
/// Leaving a connection URL unset selects the in-process backend for that collaborator.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Postgres connection string for the user store
    pub database_url: Option<String>,
    /// Upper bound on pooled store connections
    pub database_max_connections: u32,
    /// Redis connection string for the read cache
    pub redis_url: Option<String>,
    /// Namespace prepended to every cache key
    pub cache_prefix: String,
    /// TTL in seconds for cached reads
    pub cache_ttl: u64,
    /// Capacity of the in-memory cache backend
    pub cache_max_entries: usize,
    /// Interval in seconds between in-memory cache sweeps
    pub cleanup_interval: u64,
    /// Kafka/Redpanda bootstrap servers for change events
    pub kafka_brokers: Option<String>,
    /// Queue (topic) that change events are published to
    pub event_queue: String,
    /// Bound in milliseconds on each store, cache and broker call
    pub external_timeout_ms: u64,
}

/// Longest TTL a cached read may be given.
pub const MAX_CACHE_TTL_SECS: u64 = 30 * 24 * 60 * 60;

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SERVER_PORT` - HTTP server port (default: 8000)
    /// - `DATABASE_URL` - Postgres URL (default: unset, in-memory store)
    /// - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 10)
    /// - `REDIS_URL` - Redis URL (default: unset, in-memory cache)
    /// - `CACHE_PREFIX` - Cache key namespace (default: users_cache)
    /// - `CACHE_TTL` - Cached read TTL in seconds (default: 30, capped at 30 days)
    /// - `CACHE_MAX_ENTRIES` - In-memory cache capacity (default: 10000)
    /// - `CLEANUP_INTERVAL` - In-memory cache sweep interval in seconds (default: 1)
    /// - `KAFKA_BROKERS` - Broker bootstrap servers (default: unset, log-only sink)
    /// - `EVENT_QUEUE` - Event queue name (default: users_queue)
    /// - `EXTERNAL_TIMEOUT_MS` - Per-call timeout in milliseconds (default: 2000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            database_url: string_var("DATABASE_URL"),
            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or(defaults.database_max_connections),
            redis_url: string_var("REDIS_URL"),
            cache_prefix: string_var("CACHE_PREFIX").unwrap_or(defaults.cache_prefix),
            cache_ttl: parse_var("CACHE_TTL").unwrap_or(defaults.cache_ttl),
            cache_max_entries: parse_var("CACHE_MAX_ENTRIES")
                .unwrap_or(defaults.cache_max_entries),
            cleanup_interval: parse_var("CLEANUP_INTERVAL").unwrap_or(defaults.cleanup_interval),
            kafka_brokers: string_var("KAFKA_BROKERS"),
            event_queue: string_var("EVENT_QUEUE").unwrap_or(defaults.event_queue),
            external_timeout_ms: parse_var("EXTERNAL_TIMEOUT_MS")
                .unwrap_or(defaults.external_timeout_ms),
        }
    }

    /// TTL applied to cached reads.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl.min(MAX_CACHE_TTL_SECS))
    }

    /// Timeout applied to every call into the store, cache or broker.
    pub fn external_timeout(&self) -> Duration {
        Duration::from_millis(self.external_timeout_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8000,
            database_url: None,
            database_max_connections: 10,
            redis_url: None,
            cache_prefix: "users_cache".to_string(),
            cache_ttl: 30,
            cache_max_entries: 10_000,
            cleanup_interval: 1,
            kafka_brokers: None,
            event_queue: "users_queue".to_string(),
            external_timeout_ms: 2_000,
        }
    }
}

fn string_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
