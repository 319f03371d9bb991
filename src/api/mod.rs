//! API Module
//!
//! HTTP handlers, routing and shared state for the user service REST API.
//!
//! # Endpoints
//! - `POST /users` - Create a user
//! - `GET /users` - List users, optionally by one of `ids`, `email`, `nickname`
//! - `GET /users/:user_id` - Fetch a user
//! - `PUT /users/:user_id` - Partially update a user
//! - `DELETE /users/:user_id` - Delete a user
//! - `GET /stats` - Cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;
pub mod state;

pub use handlers::*;
pub use routes::create_router;
pub use state::{AppState, BackgroundTasks};
