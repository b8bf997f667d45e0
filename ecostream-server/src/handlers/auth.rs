//! Login and token check handlers

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::{verify_password, SessionUser};
use crate::error::ApiError;
use crate::handlers::JsonBody;
use crate::state::AppState;

/// Login credentials
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "admin")]
    pub username: String,
    #[schema(example = "admin")]
    pub password: String,
}

/// Issued session token
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Bearer token, valid for 15 minutes
    pub token: String,
}

fn invalid_credentials() -> ApiError {
    ApiError::auth_error("AUTH_INVALID_CREDENTIALS", "Invalid username or password")
}

/// Exchange username and password for a session token
#[utoipa::path(
    post,
    path = "/login/",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted", body = LoginResponse),
        (status = 400, description = "Malformed request body"),
        (status = 401, description = "Unknown user, inactive user or wrong password")
    )
)]
pub async fn login_handler(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = state
        .users
        .get_by_username(state.deadline(), &request.username)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !user.is_active {
        tracing::info!(user_id = %user.id, "Login refused for inactive user");
        return Err(invalid_credentials());
    }

    let hash = user.password_hash.clone().ok_or_else(invalid_credentials)?;
    let password = request.password;
    let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ApiError::internal(format!("Password check failed: {}", e)))?;

    if !matches {
        return Err(invalid_credentials());
    }

    let token = state.session_keys.issue(&user.username)?;
    tracing::info!(user_id = %user.id, "Session issued");

    Ok(Json(LoginResponse { token }))
}

/// Check a session token
///
/// Answers 200 with an empty body while the token is valid.
#[utoipa::path(
    get,
    path = "/authenticate/",
    tag = "Auth",
    responses(
        (status = 200, description = "Token valid"),
        (status = 401, description = "Missing, malformed or expired token")
    ),
    security(("session_token" = []))
)]
pub async fn authenticate_handler(session: SessionUser) -> StatusCode {
    tracing::debug!(username = %session.username, "Session token verified");
    StatusCode::OK
}
