//! Kafka / Redpanda broker
//!
//! Each queue maps to a topic, created by the broker on first publish. Events
//! are keyed by user id so one user's events land in one partition, in order.

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use tracing::info;

use crate::error::{Result, ServiceError};
use crate::events::EventBroker;

pub struct KafkaBroker {
    producer: FutureProducer,
    timeout: Duration,
}

impl KafkaBroker {
    /// Creates a producer for the given bootstrap servers.
    pub fn connect(brokers: &str, timeout: Duration) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", timeout.as_millis().to_string())
            .create()
            .map_err(|e| {
                ServiceError::BrokerUnavailable(format!("failed to create producer: {}", e))
            })?;

        info!(brokers = %brokers, "Kafka producer created");
        Ok(Self { producer, timeout })
    }
}

#[async_trait]
impl EventBroker for KafkaBroker {
    async fn publish(&self, queue: &str, key: &str, payload: &[u8]) -> Result<()> {
        let record = FutureRecord::to(queue).key(key).payload(payload);

        self.producer
            .send(record, Timeout::After(self.timeout))
            .await
            .map_err(|(e, _)| ServiceError::BrokerUnavailable(format!("kafka send error: {}", e)))?;

        Ok(())
    }
}
