//! Bearer-token authentication
//!
//! Two credential kinds are accepted, both as `Authorization: Bearer <token>`:
//! - the static shared token (`TOKEN`), compared in constant time, carrying no identity
//! - a session token issued by `/login/`, carrying the username (see [`session`])
//!
//! Provides the `SessionUser` extractor and the
//! `require_user_auth` middleware guarding mutating `/users/` requests.

pub mod password;
pub mod session;

pub use password::{hash_password, verify_password};
pub use session::{SessionClaims, SessionKeys, SESSION_TTL};

use axum::extract::{FromRequestParts, Request, State};
use axum::http::{request::Parts, HeaderMap, Method};
use axum::middleware::Next;
use axum::response::Response;
use subtle::ConstantTimeEq;

use crate::config::{Secret, UserAuthMode};
use crate::error::ApiError;
use crate::state::AppState;

/// Extract the Bearer token from the Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| {
            ApiError::auth_error("AUTH_MISSING_TOKEN", "Missing Authorization header")
        })?;

    let auth_value = auth_header.to_str().map_err(|_| {
        ApiError::auth_error(
            "AUTH_INVALID_TOKEN",
            "Invalid Authorization header encoding",
        )
    })?;

    auth_value.strip_prefix("Bearer ").ok_or_else(|| {
        ApiError::auth_error(
            "AUTH_INVALID_TOKEN",
            "Authorization header must use Bearer scheme",
        )
    })
}

/// Shared static secret
#[derive(Debug, Clone)]
pub struct StaticToken {
    secret: Secret<String>,
}

impl StaticToken {
    pub fn new(secret: Secret<String>) -> Self {
        Self { secret }
    }

    /// Byte-for-byte comparison in constant time
    pub fn verify(&self, presented: &str) -> bool {
        self.secret
            .reveal()
            .as_bytes()
            .ct_eq(presented.as_bytes())
            .into()
    }

    fn check(&self, presented: &str) -> Result<(), ApiError> {
        if self.verify(presented) {
            Ok(())
        } else {
            Err(ApiError::auth_error("AUTH_INVALID_TOKEN", "Invalid token"))
        }
    }
}

/// Caller authenticated by a session token.
///
/// Holds the username from the token's `sub` claim. Returns 401 with
/// structured error codes on any failure.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub username: String,
}

impl FromRequestParts<AppState> for SessionUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)?;
        let username = state.session_keys.verify(token)?;
        Ok(SessionUser { username })
    }
}

/// Gate for mutating `/users/` requests, per `USERS_AUTH`.
///
/// Reads (GET, HEAD, OPTIONS) always pass.
pub async fn require_user_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if matches!(
        *request.method(),
        Method::GET | Method::HEAD | Method::OPTIONS
    ) {
        return Ok(next.run(request).await);
    }

    match state.config.user_auth {
        UserAuthMode::None => {}
        UserAuthMode::StaticToken => {
            let token = extract_bearer_token(request.headers())?;
            state.static_token.check(token)?;
        }
        UserAuthMode::Session => {
            let token = extract_bearer_token(request.headers())?;
            let username = state.session_keys.verify(token)?;
            tracing::debug!(username = %username, "Session accepted for user mutation");
        }
    }

    Ok(next.run(request).await)
}
