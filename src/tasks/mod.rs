//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired entries from the in-memory cache backend
//!
//! The event publish worker lives with the emitter in `events`.

mod cleanup;

pub use cleanup::spawn_cleanup_task;
