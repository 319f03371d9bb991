//! Cache Module
//!
//! Cache-aside reads and write-side invalidation over a pluggable key-value
//! cache service (in-memory or Redis).

mod backend;
mod coherence;
mod entry;
mod keys;
mod memory;
mod redis_cache;
mod stats;
mod store;


// Re-export public types
pub use backend::CacheBackend;
pub use coherence::{CacheStatus, Cached, CoherentCache};
pub use entry::CacheEntry;
pub use keys::{CacheKey, KeySpace};
pub use memory::MemoryCache;
pub use redis_cache::RedisCache;
pub use stats::{CacheCounters, CacheStats};
pub use store::CacheStore;

// == Public Constants ==
/// Module segment of every user cache key
pub const USER_MODULE: &str = "users";

/// Read family for GET /users/{id}
pub const GET_USER: &str = "get_user";

/// Read family for GET /users
pub const FILTER_USERS: &str = "filter_users";

/// Read families whose results any user write can change.
pub const USER_READ_FAMILIES: &[&str] = &[GET_USER, FILTER_USERS];
