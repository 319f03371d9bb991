//! Domain models and DTOs for the user service
//!
//! This module defines the user entity, the request bodies and query
//! selectors that act on it, the change event published after writes, and
//! the bodies of the operational endpoints.

pub mod event;
pub mod requests;
pub mod responses;
pub mod user;

// Re-export commonly used types
pub use event::{ActionType, UserEvent};
pub use requests::{FilterParams, NewUser, UserUpdate};
pub use responses::{HealthResponse, StatsResponse};
pub use user::{User, UserFilter, UserId};
