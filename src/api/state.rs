//! Shared application state
//!
//! Builds the process-wide clients for the store, cache and broker once at
//! startup and hands them to every request through `AppState`.

use std::sync::Arc;

use anyhow::Context;
use tokio::task::JoinHandle;
#[cfg(feature = "kafka")]
use tracing::info;
use tracing::warn;

use crate::cache::{CacheBackend, CoherentCache, KeySpace, MemoryCache, RedisCache, USER_MODULE};
use crate::config::Config;
#[cfg(feature = "kafka")]
use crate::events::KafkaBroker;
use crate::events::{EventBroker, EventEmitter, LogBroker};
use crate::service::UserService;
use crate::store::{MemoryUserStore, PgUserStore, UserStore};
use crate::tasks::spawn_cleanup_task;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<UserService>,
}

/// Long-running tasks started alongside the state.
pub struct BackgroundTasks {
    /// Publishes queued events; ends once the state is dropped and the queue drained
    pub event_worker: JoinHandle<()>,
    /// Sweeps expired entries from the in-memory cache, if that backend is used
    pub cache_cleanup: Option<JoinHandle<()>>,
}

impl AppState {
    pub fn new(service: UserService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }

    /// Assembles the state from already constructed collaborators.
    ///
    /// Returns the state and the handle of the event publish worker.
    pub fn from_parts(
        config: &Config,
        store: Arc<dyn UserStore>,
        cache: Arc<dyn CacheBackend>,
        broker: Arc<dyn EventBroker>,
    ) -> (Self, JoinHandle<()>) {
        let timeout = config.external_timeout();

        let (events, event_worker) =
            EventEmitter::spawn(broker, config.event_queue.clone(), timeout);
        let cache = CoherentCache::new(
            cache,
            KeySpace::new(config.cache_prefix.clone(), USER_MODULE),
            config.cache_ttl(),
            timeout,
        );

        let service = UserService::new(store, cache, events, timeout);
        (Self::new(service), event_worker)
    }

    /// Connects to the configured store, cache and broker.
    ///
    /// The store and cache fall back to in-process backends without a URL; events
    /// fall back to a log-only sink.
    pub async fn connect(config: &Config) -> anyhow::Result<(Self, BackgroundTasks)> {
        let store = connect_store(config).await?;

        let mut cache_cleanup = None;
        let cache: Arc<dyn CacheBackend> = match &config.redis_url {
            Some(url) => Arc::new(
                RedisCache::connect(url)
                    .await
                    .context("failed to connect to Redis cache")?,
            ),
            None => {
                warn!("REDIS_URL not set, using in-memory cache");
                let cache = MemoryCache::new(config.cache_max_entries);
                cache_cleanup = Some(spawn_cleanup_task(cache.store(), config.cleanup_interval));
                Arc::new(cache)
            }
        };

        let broker = connect_broker(config)?;

        let (state, event_worker) = Self::from_parts(config, store, cache, broker);
        Ok((
            state,
            BackgroundTasks {
                event_worker,
                cache_cleanup,
            },
        ))
    }
}

async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn UserStore>> {
    match &config.database_url {
        Some(url) => {
            let store = PgUserStore::connect(
                url,
                config.database_max_connections,
                config.external_timeout(),
            )
            .await
            .context("failed to connect to Postgres")?;
            store
                .ensure_schema()
                .await
                .context("failed to create users table")?;
            Ok(Arc::new(store))
        }
        None => {
            warn!("DATABASE_URL not set, using in-memory user store");
            Ok(Arc::new(MemoryUserStore::new()))
        }
    }
}

fn connect_broker(config: &Config) -> anyhow::Result<Arc<dyn EventBroker>> {
    #[cfg(feature = "kafka")]
    {
        if let Some(brokers) = &config.kafka_brokers {
            let broker = KafkaBroker::connect(brokers, config.external_timeout())
                .context("failed to create Kafka producer")?;
            info!(queue = %config.event_queue, "Publishing events to Kafka");
            return Ok(Arc::new(broker));
        }
    }

    #[cfg(not(feature = "kafka"))]
    {
        if config.kafka_brokers.is_some() {
            warn!("KAFKA_BROKERS is set but the kafka feature is disabled");
        }
    }

    warn!(
        queue = %config.event_queue,
        "No event broker configured, events are logged and discarded"
    );
    Ok(Arc::new(LogBroker::new()))
}
