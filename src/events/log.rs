//! Log-only broker
//!
//! Used when no broker is configured. Each event is written to the log at
//! debug level and then discarded; nothing is retained between publishes.

use async_trait::async_trait;
use tracing::debug;

use crate::error::Result;
use crate::events::EventBroker;

#[derive(Debug, Clone, Copy, Default)]
pub struct LogBroker;

impl LogBroker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventBroker for LogBroker {
    async fn publish(&self, queue: &str, key: &str, payload: &[u8]) -> Result<()> {
        debug!(
            queue = %queue,
            key = %key,
            payload = %String::from_utf8_lossy(payload),
            "Event discarded, no broker configured"
        );
        Ok(())
    }
}
