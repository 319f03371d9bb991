//! Error types for the user service
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

// == Service Error Enum ==
/// Unified error type for the user service.
///
/// Only `NotFound` and `InvalidParameters` are meant for the client. The
/// infrastructure variants surface as a generic server error when they reach
/// the HTTP layer at all; cache and broker failures are normally absorbed
/// before that.
#[derive(Error, Debug)]
pub enum ServiceError {
    /// No user with the requested id
    #[error("User not found")]
    NotFound,

    /// Conflicting query selectors
    #[error("Invalid parameters")]
    InvalidParameters,

    /// Persistent store unreachable, timed out or rejected the statement
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Cache service unreachable or timed out
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    /// Message broker unreachable or timed out
    #[error("Broker unavailable: {0}")]
    BrokerUnavailable(String),
}

impl ServiceError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::InvalidParameters => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::StoreUnavailable(_)
            | ServiceError::CacheUnavailable(_)
            | ServiceError::BrokerUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Bodies are bare JSON strings, e.g. "User not found"
        let message = match &self {
            ServiceError::NotFound | ServiceError::InvalidParameters => self.to_string(),
            _ => {
                error!(error = %self, "Request failed on infrastructure error");
                "Internal server error".to_string()
            }
        };

        (status, Json(message)).into_response()
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ServiceError::NotFound,
            other => ServiceError::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<redis::RedisError> for ServiceError {
    fn from(err: redis::RedisError) -> Self {
        ServiceError::CacheUnavailable(err.to_string())
    }
}

// == Result Type Alias ==
/// Convenience Result type for the user service.
pub type Result<T> = std::result::Result<T, ServiceError>;
