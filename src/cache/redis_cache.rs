//! Redis cache backend
//!
//! Shared cache for multi-instance deployments. Entries expire through Redis
//! `EX`, and family sweeps use cursor-based `SCAN` so the server is never
//! blocked by `KEYS`.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Client;
use tracing::info;

use crate::cache::CacheBackend;
use crate::error::Result;

const SCAN_BATCH: usize = 100;

/// Cache backend talking to a Redis server.
///
/// The connection manager multiplexes one connection across all requests and
/// reconnects on failure; clones share it.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    /// Connects to Redis at `url` (e.g. "redis://localhost:6379").
    pub async fn connect(url: &str) -> Result<Self> {
        info!(url = %url, "Connecting to Redis cache");

        let client = Client::open(url)?;
        let mut conn = ConnectionManager::new(client).await?;

        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!(reply = %pong, "Redis cache connection established");

        Ok(Self { conn })
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<usize> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.clone();
        let removed: usize = redis::cmd("DEL").arg(keys).query_async(&mut conn).await?;
        Ok(removed)
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}*", escape_glob(prefix));

        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;

            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may report a key more than once
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}

/// Escapes Redis glob metacharacters so `prefix` matches literally.
fn escape_glob(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
