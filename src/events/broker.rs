//! Event Broker Trait

use async_trait::async_trait;

use crate::error::Result;

/// Publish side of a message broker.
///
/// Errors are reported as `ServiceError::BrokerUnavailable`. No delivery
/// acknowledgment beyond the publish call itself is expected.
#[async_trait]
pub trait EventBroker: Send + Sync {
    /// Publishes `payload` to `queue`. Messages sharing a `key` keep their relative order.
    async fn publish(&self, queue: &str, key: &str, payload: &[u8]) -> Result<()>;
}
