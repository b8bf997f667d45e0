//! Health check handlers
//!
//! Provides liveness and readiness endpoints for monitoring and orchestration.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Liveness message returned by `/health/`
pub const HEALTH_MESSAGE: &str = "All systems operational!";

/// GET /health/ - Liveness check
///
/// Plain-text response; does not touch any backing store.
#[utoipa::path(
    get,
    path = "/health/",
    tag = "Health",
    responses(
        (status = 200, description = "Server is up", body = String, content_type = "text/plain")
    )
)]
pub async fn health() -> &'static str {
    HEALTH_MESSAGE
}

/// Readiness response
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Whether the service is ready to accept traffic
    pub ready: bool,
    /// Record store backend in use
    pub store: &'static str,
    /// Optional message explaining status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// GET /ready/ - Readiness probe
///
/// Returns 200 when the record store answers, 503 otherwise.
#[utoipa::path(
    get,
    path = "/ready/",
    tag = "Health",
    responses(
        (status = 200, description = "Ready to accept traffic", body = ReadyResponse),
        (status = 503, description = "Record store unreachable", body = ReadyResponse)
    )
)]
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let store = state.store.name();
    let check = state
        .deadline()
        .run("store.health", state.store.check_health())
        .await;

    match check {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                store,
                message: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(store = store, error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    ready: false,
                    store,
                    message: Some(e.to_string()),
                }),
            )
        }
    }
}
