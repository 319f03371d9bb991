//! In-process user store
//!
//! Used when no database URL is configured, and in tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Result, ServiceError};
use crate::models::{NewUser, User, UserFilter, UserId, UserUpdate};
use crate::store::UserStore;

#[derive(Debug)]
struct UserTable {
    rows: BTreeMap<UserId, User>,
    next_id: UserId,
}

/// User store held in process memory. Ids start at 1 and are never reused.
#[derive(Debug, Clone)]
pub struct MemoryUserStore {
    table: Arc<RwLock<UserTable>>,
    available: Arc<AtomicBool>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            table: Arc::new(RwLock::new(UserTable {
                rows: BTreeMap::new(),
                next_id: 1,
            })),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Makes every operation fail with `StoreUnavailable` while `false`.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ServiceError::StoreUnavailable(
                "in-memory store is offline".to_string(),
            ))
        }
    }
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get(&self, id: UserId) -> Result<User> {
        self.check_available()?;
        self.table
            .read()
            .await
            .rows
            .get(&id)
            .cloned()
            .ok_or(ServiceError::NotFound)
    }

    async fn find(&self, filter: &UserFilter) -> Result<Vec<User>> {
        self.check_available()?;
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .filter(|user| filter.matches(user))
            .cloned()
            .collect())
    }

    async fn insert(&self, new_user: NewUser) -> Result<User> {
        self.check_available()?;
        let mut table = self.table.write().await;

        let user = User {
            id: table.next_id,
            email: new_user.email,
            nickname: new_user.nickname,
        };
        table.next_id += 1;
        table.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, id: UserId, changes: &UserUpdate) -> Result<User> {
        self.check_available()?;
        let mut table = self.table.write().await;

        let user = table.rows.get_mut(&id).ok_or(ServiceError::NotFound)?;
        changes.apply(user);
        Ok(user.clone())
    }

    async fn delete(&self, id: UserId) -> Result<User> {
        self.check_available()?;
        self.table
            .write()
            .await
            .rows
            .remove(&id)
            .ok_or(ServiceError::NotFound)
    }
}
