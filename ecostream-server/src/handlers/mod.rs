//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints, and
//! the `JsonBody` extractor they share for request bodies.

pub mod auth;
pub mod files;
pub mod health;
pub mod items;
pub mod users;

use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

pub use auth::{authenticate_handler, login_handler, LoginRequest, LoginResponse};
pub use files::{download_file_handler, upload_file_handler, FileUploadResponse};
pub use health::{health, ready, ReadyResponse, HEALTH_MESSAGE};
pub use items::{
    create_item_handler, delete_item_handler, get_item_handler, list_items_handler,
    update_item_handler, CreateItemRequest, UpdatedItemResponse,
};
pub use users::{
    create_user_handler, delete_user_handler, get_user_handler, list_users_handler,
    update_user_handler, CreateUserRequest,
};

/// JSON request body.
///
/// Unlike `axum::Json`, no `Content-Type` is required and every failure
/// (unreadable body, invalid JSON, wrong shape) is a 400 with the standard
/// error body.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read request body: {}", e)))?;

        serde_json::from_slice(&bytes)
            .map(JsonBody)
            .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {}", e)))
    }
}
