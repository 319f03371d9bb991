//! Event Emitter
//!
//! Hands change events to a single background worker over a bounded channel.
//! `emit` never waits: if the worker has stopped or the buffer is full the
//! event is dropped with a warning. The worker publishes in arrival order, so
//! events for one user leave in the order their writes were sequenced here.
//! Delivery is at most once; failed publishes are logged and not retried.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{Result, ServiceError};
use crate::events::EventBroker;
use crate::models::{ActionType, User, UserEvent};

/// Events that may wait for the publish worker before new ones are dropped.
pub const EVENT_BUFFER_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct EventEmitter {
    sender: mpsc::Sender<UserEvent>,
}

impl EventEmitter {
    /// Starts the publish worker and returns the emitter feeding it.
    ///
    /// The worker exits once every emitter clone has been dropped and the
    /// buffer is drained, so awaiting the handle after shutdown flushes
    /// pending events.
    pub fn spawn(
        broker: Arc<dyn EventBroker>,
        queue: impl Into<String>,
        publish_timeout: Duration,
    ) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(EVENT_BUFFER_CAPACITY);
        let handle = tokio::spawn(publish_worker(
            receiver,
            broker,
            queue.into(),
            publish_timeout,
        ));
        (Self { sender }, handle)
    }

    /// Schedules an event describing a committed write.
    pub fn emit(&self, action_type: ActionType, user: User) {
        let user_id = user.id;
        match self.sender.try_send(UserEvent::new(action_type, user)) {
            Ok(()) => debug!(action = %action_type, user_id, "Event scheduled"),
            Err(TrySendError::Full(_)) => {
                warn!(action = %action_type, user_id, "Event buffer full, dropping event")
            }
            Err(TrySendError::Closed(_)) => {
                warn!(action = %action_type, user_id, "Event worker stopped, dropping event")
            }
        }
    }
}

async fn publish_worker(
    mut receiver: mpsc::Receiver<UserEvent>,
    broker: Arc<dyn EventBroker>,
    queue: String,
    publish_timeout: Duration,
) {
    info!(queue = %queue, "Event publish worker started");

    while let Some(event) = receiver.recv().await {
        let action = event.action_type;
        let user_id = event.user.id;

        match publish(broker.as_ref(), &queue, &event, publish_timeout).await {
            Ok(()) => debug!(queue = %queue, action = %action, user_id, "Event published"),
            Err(err) => warn!(
                queue = %queue,
                action = %action,
                user_id,
                error = %err,
                "Event publish failed, event dropped"
            ),
        }
    }

    info!(queue = %queue, "Event publish worker stopped");
}

async fn publish(
    broker: &dyn EventBroker,
    queue: &str,
    event: &UserEvent,
    publish_timeout: Duration,
) -> Result<()> {
    let payload = serde_json::to_vec(event)
        .map_err(|e| ServiceError::BrokerUnavailable(format!("could not encode event: {}", e)))?;
    let key = event.user.id.to_string();

    tokio::time::timeout(publish_timeout, broker.publish(queue, &key, &payload))
        .await
        .map_err(|_| {
            ServiceError::BrokerUnavailable(format!(
                "publish timed out after {}ms",
                publish_timeout.as_millis()
            ))
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemoryBroker;
    use async_trait::async_trait;

    fn user(id: i64) -> User {
        User {
            id,
            email: Some(format!("user{}@mail.com", id)),
            nickname: None,
        }
    }

    /// Drops the emitter and waits for the worker to drain.
    async fn finish(emitter: EventEmitter, handle: JoinHandle<()>) {
        drop(emitter);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker should stop once the emitter is dropped")
            .unwrap();
    }

    #[tokio::test]
    async fn test_events_published_in_order() {
        let broker = MemoryBroker::new();
        let (emitter, handle) =
            EventEmitter::spawn(Arc::new(broker.clone()), "users_queue", Duration::from_secs(1));

        emitter.emit(ActionType::Create, user(1));
        emitter.emit(ActionType::Update, user(1));
        emitter.emit(ActionType::Delete, user(1));
        finish(emitter, handle).await;

        let actions: Vec<ActionType> = broker.events().iter().map(|e| e.action_type).collect();
        assert_eq!(
            actions,
            vec![ActionType::Create, ActionType::Update, ActionType::Delete]
        );
        assert!(broker
            .messages()
            .iter()
            .all(|m| m.queue == "users_queue" && m.key == "1"));
    }

    #[tokio::test]
    async fn test_broker_outage_drops_events_without_stopping_worker() {
        let broker = MemoryBroker::new();
        broker.set_available(false);
        let (emitter, handle) =
            EventEmitter::spawn(Arc::new(broker.clone()), "users_queue", Duration::from_secs(1));

        emitter.emit(ActionType::Create, user(1));
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        broker.set_available(true);
        emitter.emit(ActionType::Create, user(2));
        finish(emitter, handle).await;

        let events = broker.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].user.id, 2);
    }

    struct StalledBroker;

    #[async_trait]
    impl EventBroker for StalledBroker {
        async fn publish(&self, _queue: &str, _key: &str, _payload: &[u8]) -> Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_publish_times_out() {
        let (emitter, handle) =
            EventEmitter::spawn(Arc::new(StalledBroker), "users_queue", Duration::from_secs(2));

        emitter.emit(ActionType::Create, user(1));
        emitter.emit(ActionType::Create, user(2));

        // Both publishes give up after the timeout and the worker drains
        finish(emitter, handle).await;
    }

    #[tokio::test]
    async fn test_emit_after_worker_stopped_does_not_panic() {
        let broker = MemoryBroker::new();
        let (emitter, handle) =
            EventEmitter::spawn(Arc::new(broker.clone()), "users_queue", Duration::from_secs(1));
        handle.abort();
        let _ = handle.await;

        emitter.emit(ActionType::Delete, user(1));
        assert!(broker.messages().is_empty());
    }
}
