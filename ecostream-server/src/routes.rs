//! Router configuration module
//!
//! Configures all routes, middleware layers, and creates the application router.

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware,
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::require_user_auth;
use crate::config::Config;
use crate::handlers::{
    authenticate_handler, create_item_handler, create_user_handler, delete_item_handler,
    delete_user_handler, download_file_handler, get_item_handler, get_user_handler, health,
    list_items_handler, list_users_handler, login_handler, ready, update_item_handler,
    update_user_handler, upload_file_handler,
};
use crate::openapi::ApiDoc;
use crate::state::AppState;

const CORS_METHODS: [Method; 5] = [
    Method::POST,
    Method::GET,
    Method::OPTIONS,
    Method::PUT,
    Method::DELETE,
];

fn cors_layer(config: &Config) -> CorsLayer {
    let headers = [
        header::ACCEPT,
        header::CONTENT_TYPE,
        header::CONTENT_LENGTH,
        header::ACCEPT_ENCODING,
        HeaderName::from_static("x-csrf-token"),
        header::AUTHORIZATION,
    ];

    let origins = match &config.allowed_origins {
        Some(origins) if !origins.is_empty() => {
            let origins: Vec<HeaderValue> =
                origins.iter().filter_map(|o| o.parse().ok()).collect();
            tracing::info!("CORS: Restricting to {} origin(s)", origins.len());
            AllowOrigin::list(origins)
        }
        _ => {
            tracing::warn!("CORS: Allowing all origins");
            AllowOrigin::any()
        }
    };

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(CORS_METHODS)
        .allow_headers(headers)
}

/// Create the application router over in-memory backends (for testing)
pub fn create_router() -> Router {
    create_router_with_state(AppState::in_memory(Config::default()))
}

/// Create the application router over connected backends
pub fn create_router_with_state(state: AppState) -> Router {
    let config = state.config.clone();
    let body_limit = config.body_limit_mb * 1024 * 1024;

    let timeout = TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(config.timeout_secs),
    );

    // Mutations are gated per USERS_AUTH; route_layer keeps 405s ungated
    let users = Router::new()
        .route("/users/", get(list_users_handler).post(create_user_handler))
        .route(
            "/users/{id}",
            get(get_user_handler)
                .put(update_user_handler)
                .delete(delete_user_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_user_auth,
        ));

    let items = Router::new()
        .route("/items/", get(list_items_handler).post(create_item_handler))
        .route(
            "/items/{id}",
            get(get_item_handler)
                .put(update_item_handler)
                .delete(delete_item_handler),
        );

    tracing::info!(users_auth = ?config.user_auth, "User mutations authorization");

    Router::new()
        .route("/health", get(health))
        .route("/health/", get(health))
        .route("/ready", get(ready))
        .route("/ready/", get(ready))
        .route("/login/", axum::routing::post(login_handler))
        .route("/authenticate/", get(authenticate_handler))
        .route("/files/", axum::routing::post(upload_file_handler))
        .route("/files/{name}", get(download_file_handler))
        .merge(users)
        .merge(items)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(timeout)
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http())
}
