//! Response DTOs for the operational endpoints
//!
//! User endpoints answer with the entity itself or a bare JSON string; the
//! bodies defined here are for `/stats` and `/health`.

use serde::Serialize;

use crate::cache::CacheStats;

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Reads answered from the cache
    pub hits: u64,
    /// Reads that fell through to the store
    pub misses: u64,
    /// Cache entries removed by write-side invalidation
    pub invalidations: u64,
    /// Invalidation sweeps that could not reach the cache
    pub invalidation_failures: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl From<CacheStats> for StatsResponse {
    fn from(stats: CacheStats) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            invalidations: stats.invalidations,
            invalidation_failures: stats.invalidation_failures,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
