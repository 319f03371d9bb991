//! API Handlers
//!
//! HTTP request handlers for each user service endpoint.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::api::AppState;
use crate::cache::Cached;
use crate::error::Result;
use crate::models::{
    FilterParams, HealthResponse, NewUser, StatsResponse, User, UserId, UserUpdate,
};

/// Response header reporting whether a read was served from the cache.
pub const CACHE_STATUS_HEADER: &str = "x-users-cache";

fn cached_response<T: Serialize>(read: Cached<T>) -> Response {
    (
        [(CACHE_STATUS_HEADER, read.status.as_header_value())],
        Json(read.value),
    )
        .into_response()
}

/// Handler for POST /users
pub async fn create_user_handler(
    State(state): State<AppState>,
    Json(new_user): Json<NewUser>,
) -> Result<Json<User>> {
    let user = state.service.create_user(new_user).await?;
    Ok(Json(user))
}

/// Handler for GET /users/:user_id
pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Response> {
    let read = state.service.get_user(user_id).await?;
    Ok(cached_response(read))
}

/// Handler for PUT /users/:user_id
///
/// Only the fields present in the body are changed.
pub async fn update_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
    Json(changes): Json<UserUpdate>,
) -> Result<Json<User>> {
    let user = state.service.update_user(user_id, changes).await?;
    Ok(Json(user))
}

/// Handler for DELETE /users/:user_id
pub async fn delete_user_handler(
    State(state): State<AppState>,
    Path(user_id): Path<UserId>,
) -> Result<Json<&'static str>> {
    state.service.delete_user(user_id).await?;
    Ok(Json("User deleted"))
}

/// Handler for GET /users
///
/// Accepts at most one of `ids`, `email`, `nickname`.
pub async fn filter_users_handler(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> Result<Response> {
    let read = state.service.filter_users(params).await?;
    Ok(cached_response(read))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.service.cache_stats().into())
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
