//! User endpoint handlers.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
};
use tracing::{debug, info, instrument};

use crate::user::{User, UserUpdate};

use super::error::{ApiError, ApiResult};
use super::extract::{AppJson, AppPath};
use super::state::AppState;

/// List all users.
#[instrument(skip(state))]
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    let users = state.users.find_all().await?;
    debug!(count = users.len(), "Listed users");
    Ok(Json(users))
}

/// Get a user by id.
#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> ApiResult<Json<User>> {
    state
        .users
        .find_by_id(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

/// Create a user. Any id in the body is ignored.
#[instrument(skip(state, user))]
pub async fn create_user(
    State(state): State<AppState>,
    AppJson(user): AppJson<User>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let saved = state.users.save(user.into_new()).await?;
    info!(user_id = ?saved.id, "Created user");
    Ok((StatusCode::CREATED, Json(saved)))
}

/// Update an existing user. Missing users are not created, including one
/// deleted between the lookup and the write.
#[instrument(skip(state, update))]
pub async fn update_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppJson(update): AppJson<UserUpdate>,
) -> ApiResult<Json<User>> {
    let mut user = state
        .users
        .find_by_id(id)
        .await?
        .ok_or(ApiError::NotFound)?;

    user.apply(update);
    user.id = Some(id);

    let saved = state.users.save(user).await?;
    info!(user_id = id, "Updated user");
    Ok(Json(saved))
}

/// Delete a user. Deleting a missing id still succeeds.
#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
) -> ApiResult<StatusCode> {
    state.users.delete_by_id(id).await?;
    info!(user_id = id, "Deleted user");
    Ok(StatusCode::NO_CONTENT)
}

/// Liveness check; does not touch the repository.
pub async fn health() -> &'static str {
    "OK"
}
