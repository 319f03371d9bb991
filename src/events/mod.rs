//! Event Module
//!
//! Best-effort change notifications. Writes hand events to the
//! `EventEmitter`, which queues them for a background worker that publishes
//! to the broker; nothing on the request path waits for the broker.

mod broker;
mod emitter;
#[cfg(feature = "kafka")]
mod kafka;
mod log;
mod memory;

pub use broker::EventBroker;
pub use emitter::{EventEmitter, EVENT_BUFFER_CAPACITY};
#[cfg(feature = "kafka")]
pub use kafka::KafkaBroker;
pub use log::LogBroker;
pub use memory::{MemoryBroker, PublishedMessage};
