//! User Registry - user resource service
//!
//! CRUD over users kept in a persistent store, with cache-aside reads,
//! family-wide cache invalidation on writes and best-effort change events.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod service;
pub mod store;
pub mod tasks;

pub use api::{create_router, AppState, BackgroundTasks};
pub use config::Config;
pub use error::{Result, ServiceError};
pub use service::UserService;
