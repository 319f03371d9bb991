//! Store Adapter
//!
//! Entity operations against the persistent store. Nothing here caches or
//! emits events; store failures surface as `StoreUnavailable` and missing
//! ids as `NotFound`.

mod memory;
mod postgres;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{NewUser, User, UserFilter, UserId, UserUpdate};

/// Persistent store of users.
///
/// Implementations must be safe to share across all in-flight requests.
/// Concurrent writes to one id are serialized by the store itself.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fetches one user by id.
    async fn get(&self, id: UserId) -> Result<User>;

    /// Returns every user matching `filter`, ordered by id.
    async fn find(&self, filter: &UserFilter) -> Result<Vec<User>>;

    /// Inserts a new user; the store assigns the id.
    async fn insert(&self, new_user: NewUser) -> Result<User>;

    /// Applies the provided fields of `changes` and returns the updated user.
    async fn update(&self, id: UserId, changes: &UserUpdate) -> Result<User>;

    /// Removes a user and returns it as it was before removal.
    async fn delete(&self, id: UserId) -> Result<User>;
}
