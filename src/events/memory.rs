//! In-process broker
//!
//! Records every published message so tests can inspect or cut off
//! delivery. Retains messages without bound; never wire it into a server.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Result, ServiceError};
use crate::events::EventBroker;
use crate::models::UserEvent;

/// A message as it was handed to the broker.
#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub queue: String,
    pub key: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    messages: Arc<Mutex<Vec<PublishedMessage>>>,
    offline: Arc<AtomicBool>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every publish fail with `BrokerUnavailable` while `false`.
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Published payloads decoded as user events, in publish order.
    pub fn events(&self) -> Vec<UserEvent> {
        self.messages()
            .iter()
            .filter_map(|message| serde_json::from_slice(&message.payload).ok())
            .collect()
    }
}

#[async_trait]
impl EventBroker for MemoryBroker {
    async fn publish(&self, queue: &str, key: &str, payload: &[u8]) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ServiceError::BrokerUnavailable(
                "in-memory broker is offline".to_string(),
            ));
        }

        debug!(queue = %queue, key = %key, bytes = payload.len(), "Message accepted");
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(PublishedMessage {
                queue: queue.to_string(),
                key: key.to_string(),
                payload: payload.to_vec(),
            });
        Ok(())
    }
}
