//! User CRUD handlers
//!
//! Reads are open; mutations pass through `require_user_auth` (see `routes`).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::auth::hash_password;
use crate::db::{UpdateUser, User, UserResponse};
use crate::error::ApiError;
use crate::handlers::JsonBody;
use crate::state::AppState;

/// Request for creating a user
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    #[schema(example = "alice")]
    pub username: String,
    /// Login password; accounts created without one cannot log in
    #[serde(default)]
    pub password: Option<String>,
}

/// List all users
#[utoipa::path(
    get,
    path = "/users/",
    tag = "Users",
    responses(
        (status = 200, description = "All users", body = Vec<UserResponse>),
        (status = 503, description = "Record store unavailable")
    )
)]
pub async fn list_users_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.users.list(state.deadline()).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Get one user
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "User identifier")),
    responses(
        (status = 200, description = "User found", body = UserResponse),
        (status = 404, description = "No such user")
    )
)]
pub async fn get_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .users
        .get(state.deadline(), &id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("User '{}' not found", id)))?;

    Ok(Json(UserResponse::from(user)))
}

/// Create a user
///
/// The identifier is generated by the server; new users are active.
#[utoipa::path(
    post,
    path = "/users/",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Malformed request body"),
        (status = 401, description = "Credential required by USERS_AUTH missing or invalid"),
        (status = 409, description = "Username already taken")
    ),
    security((), ("static_token" = []), ("session_token" = []))
)]
pub async fn create_user_handler(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    if request.username.trim().is_empty() {
        return Err(ApiError::bad_request("Username must not be empty"));
    }

    let password_hash = match request.password {
        Some(password) => Some(
            tokio::task::spawn_blocking(move || hash_password(&password))
                .await
                .map_err(|e| ApiError::internal(format!("Password hashing failed: {}", e)))??,
        ),
        None => None,
    };

    let user = User::new(request.username, password_hash);
    state.users.create(state.deadline(), &user).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User created");
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Replace a user's username and active flag
///
/// Updating an unknown id succeeds without creating a user.
#[utoipa::path(
    put,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "User identifier")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "Update applied", body = UserResponse),
        (status = 400, description = "Malformed request body"),
        (status = 401, description = "Credential required by USERS_AUTH missing or invalid"),
        (status = 409, description = "Username already taken")
    ),
    security((), ("static_token" = []), ("session_token" = []))
)]
pub async fn update_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<UpdateUser>,
) -> Result<Json<UserResponse>, ApiError> {
    let affected = state.users.update(state.deadline(), &id, &request).await?;
    if affected {
        tracing::info!(user_id = %id, "User updated");
    } else {
        tracing::info!(user_id = %id, "Update matched no user");
    }

    Ok(Json(UserResponse {
        id,
        username: request.username,
        is_active: request.is_active,
    }))
}

/// Delete a user
///
/// Deleting an unknown id succeeds.
#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "User identifier")),
    responses(
        (status = 204, description = "User removed (or never existed)"),
        (status = 401, description = "Credential required by USERS_AUTH missing or invalid")
    ),
    security((), ("static_token" = []), ("session_token" = []))
)]
pub async fn delete_user_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.users.delete(state.deadline(), &id).await?;
    tracing::info!(user_id = %id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}
