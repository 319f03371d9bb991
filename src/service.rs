//! Request orchestration
//!
//! Sequences the store, the cache and the event emitter for every user
//! operation.
//!
//! Writes: store mutation, then invalidation of every user read family, then
//! event scheduling, then the response. A store failure ends the request
//! before any cache or event side effect. Once the store has committed,
//! invalidation and event scheduling cannot turn the outcome into an error.
//!
//! Reads go through the cache and never touch the write-side machinery.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::cache::{CacheStats, Cached, CoherentCache, FILTER_USERS, GET_USER, USER_READ_FAMILIES};
use crate::error::{Result, ServiceError};
use crate::events::EventEmitter;
use crate::models::{ActionType, FilterParams, NewUser, User, UserId, UserUpdate};
use crate::store::UserStore;

pub struct UserService {
    store: Arc<dyn UserStore>,
    cache: CoherentCache,
    events: EventEmitter,
    store_timeout: Duration,
}

impl UserService {
    pub fn new(
        store: Arc<dyn UserStore>,
        cache: CoherentCache,
        events: EventEmitter,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            events,
            store_timeout,
        }
    }

    pub async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let user = self.bounded(self.store.insert(new_user)).await?;
        info!(user_id = user.id, "User created");

        self.after_commit(ActionType::Create, &user).await;
        Ok(user)
    }

    pub async fn get_user(&self, id: UserId) -> Result<Cached<User>> {
        self.cache
            .cached_read(GET_USER, &[("user_id", Some(id.to_string()))], || {
                self.bounded(self.store.get(id))
            })
            .await
    }

    /// Applies the provided fields. An empty update still commits, returns the
    /// current state and emits an `update` event.
    pub async fn update_user(&self, id: UserId, changes: UserUpdate) -> Result<User> {
        let user = self.bounded(self.store.update(id, &changes)).await?;
        info!(user_id = user.id, "User updated");

        self.after_commit(ActionType::Update, &user).await;
        Ok(user)
    }

    /// Removes a user and returns the removed snapshot.
    pub async fn delete_user(&self, id: UserId) -> Result<User> {
        let user = self.bounded(self.store.delete(id)).await?;
        info!(user_id = user.id, "User deleted");

        self.after_commit(ActionType::Delete, &user).await;
        Ok(user)
    }

    /// Lists users matching at most one selector; no selector lists everyone.
    pub async fn filter_users(&self, params: FilterParams) -> Result<Cached<Vec<User>>> {
        let filter = params.into_filter()?;

        self.cache
            .cached_read(FILTER_USERS, &filter.cache_args(), || {
                self.bounded(self.store.find(&filter))
            })
            .await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    // Best-effort follow-ups of a committed write
    async fn after_commit(&self, action: ActionType, user: &User) {
        self.cache.invalidate_all(USER_READ_FAMILIES).await;
        self.events.emit(action, user.clone());
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.store_timeout, call)
            .await
            .map_err(|_| {
                ServiceError::StoreUnavailable(format!(
                    "store call timed out after {}ms",
                    self.store_timeout.as_millis()
                ))
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStatus, KeySpace, MemoryCache, USER_MODULE};
    use crate::events::MemoryBroker;
    use crate::store::MemoryUserStore;
    use tokio::task::JoinHandle;

    struct Fixture {
        service: UserService,
        store: MemoryUserStore,
        cache: MemoryCache,
        broker: MemoryBroker,
        worker: JoinHandle<()>,
    }

    impl Fixture {
        fn new() -> Self {
            let store = MemoryUserStore::new();
            let cache = MemoryCache::new(100);
            let broker = MemoryBroker::new();
            let timeout = Duration::from_secs(1);

            let (events, worker) =
                EventEmitter::spawn(Arc::new(broker.clone()), "users_queue", timeout);
            let coherent = CoherentCache::new(
                Arc::new(cache.clone()),
                KeySpace::new("users_cache", USER_MODULE),
                Duration::from_secs(30),
                timeout,
            );
            let service = UserService::new(Arc::new(store.clone()), coherent, events, timeout);

            Self {
                service,
                store,
                cache,
                broker,
                worker,
            }
        }

        /// Stops the service and returns the events it published.
        async fn published(self) -> Vec<crate::models::UserEvent> {
            drop(self.service);
            self.worker.await.unwrap();
            self.broker.events()
        }
    }

    fn john() -> NewUser {
        NewUser {
            email: Some("john.smith@mail.com".to_string()),
            nickname: Some("Johny".to_string()),
        }
    }

    fn by_email(email: &str) -> FilterParams {
        FilterParams {
            email: Some(email.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_lifecycle_and_events() {
        let fx = Fixture::new();

        let created = fx.service.create_user(john()).await.unwrap();
        let read = fx.service.get_user(created.id).await.unwrap();
        assert_eq!(read.value, created);

        let unchanged = fx
            .service
            .update_user(created.id, UserUpdate::default())
            .await
            .unwrap();
        assert_eq!(unchanged, created);

        fx.service.delete_user(created.id).await.unwrap();
        assert!(matches!(
            fx.service.get_user(created.id).await,
            Err(ServiceError::NotFound)
        ));

        let events = fx.published().await;
        let actions: Vec<ActionType> = events.iter().map(|e| e.action_type).collect();
        assert_eq!(
            actions,
            vec![ActionType::Create, ActionType::Update, ActionType::Delete]
        );
        assert!(events.iter().all(|e| e.user == created));
    }

    #[tokio::test]
    async fn test_create_invalidates_cached_filter() {
        let fx = Fixture::new();

        let empty = fx.service.filter_users(by_email("john.smith@mail.com")).await.unwrap();
        assert!(empty.value.is_empty());
        let cached = fx.service.filter_users(by_email("john.smith@mail.com")).await.unwrap();
        assert_eq!(cached.status, CacheStatus::Hit);

        let created = fx.service.create_user(john()).await.unwrap();

        let fresh = fx.service.filter_users(by_email("john.smith@mail.com")).await.unwrap();
        assert_eq!(fresh.status, CacheStatus::Miss);
        assert_eq!(fresh.value, vec![created]);
    }

    #[tokio::test]
    async fn test_update_invalidates_cached_get() {
        let fx = Fixture::new();
        let created = fx.service.create_user(john()).await.unwrap();

        fx.service.get_user(created.id).await.unwrap();
        let hit = fx.service.get_user(created.id).await.unwrap();
        assert_eq!(hit.status, CacheStatus::Hit);

        let changes = UserUpdate {
            nickname: Some(Some("Smithy".to_string())),
            ..Default::default()
        };
        fx.service.update_user(created.id, changes).await.unwrap();

        let read = fx.service.get_user(created.id).await.unwrap();
        assert_eq!(read.status, CacheStatus::Miss);
        assert_eq!(read.value.nickname.as_deref(), Some("Smithy"));
    }

    #[tokio::test]
    async fn test_not_found_writes_have_no_side_effects() {
        let fx = Fixture::new();
        fx.service.filter_users(FilterParams::default()).await.unwrap();

        assert!(matches!(
            fx.service.update_user(999, UserUpdate::default()).await,
            Err(ServiceError::NotFound)
        ));
        assert!(matches!(
            fx.service.delete_user(999).await,
            Err(ServiceError::NotFound)
        ));

        assert_eq!(fx.cache.len().await, 1, "Cache should be untouched");
        assert_eq!(fx.service.cache_stats().invalidations, 0);
        assert!(fx.published().await.is_empty());
    }

    #[tokio::test]
    async fn test_store_outage_aborts_before_side_effects() {
        let fx = Fixture::new();
        fx.service.filter_users(FilterParams::default()).await.unwrap();
        fx.store.set_available(false);

        let result = fx.service.create_user(john()).await;
        assert!(matches!(result, Err(ServiceError::StoreUnavailable(_))));

        assert_eq!(fx.cache.len().await, 1);
        assert!(fx.published().await.is_empty());
    }

    #[tokio::test]
    async fn test_broker_outage_does_not_fail_write() {
        let fx = Fixture::new();
        fx.broker.set_available(false);

        let created = fx.service.create_user(john()).await.unwrap();
        assert_eq!(fx.store.get(created.id).await.unwrap(), created);
        assert!(fx.published().await.is_empty());
    }

    #[tokio::test]
    async fn test_cache_outage_does_not_fail_write_or_read() {
        let fx = Fixture::new();
        fx.cache.set_available(false);

        let created = fx.service.create_user(john()).await.unwrap();
        let read = fx.service.get_user(created.id).await.unwrap();
        assert_eq!(read.value, created);
        assert_eq!(fx.service.cache_stats().invalidation_failures, 2);
    }

    #[tokio::test]
    async fn test_conflicting_selectors_rejected() {
        let fx = Fixture::new();
        let params = FilterParams {
            ids: Some(1),
            email: Some("x".into()),
            nickname: None,
        };

        assert!(matches!(
            fx.service.filter_users(params).await,
            Err(ServiceError::InvalidParameters)
        ));
        assert_eq!(fx.service.cache_stats().misses, 0);
    }
}
