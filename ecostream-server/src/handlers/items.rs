//! Item CRUD handlers
//!
//! Every route requires a session token. Listing is scoped to the caller;
//! single-item reads, updates and deletes address items by id alone.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::SessionUser;
use crate::db::{Item, UpdateItem};
use crate::error::ApiError;
use crate::handlers::JsonBody;
use crate::state::AppState;

/// Request for creating an item
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateItemRequest {
    #[schema(example = "compost bin")]
    pub name: String,
}

/// Item fields echoed by an update (the owner is not part of it)
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdatedItemResponse {
    pub id: String,
    pub name: String,
    pub count: i32,
}

/// List the caller's items
#[utoipa::path(
    get,
    path = "/items/",
    tag = "Items",
    responses(
        (status = 200, description = "Items owned by the caller, by id", body = Vec<Item>),
        (status = 401, description = "Missing or invalid session token")
    ),
    security(("session_token" = []))
)]
pub async fn list_items_handler(
    State(state): State<AppState>,
    session: SessionUser,
) -> Result<Json<Vec<Item>>, ApiError> {
    let items = state.items.list(state.deadline(), &session.username).await?;
    Ok(Json(items))
}

/// Get one item
#[utoipa::path(
    get,
    path = "/items/{id}",
    tag = "Items",
    params(("id" = String, Path, description = "Item identifier")),
    responses(
        (status = 200, description = "Item found", body = Item),
        (status = 401, description = "Missing or invalid session token"),
        (status = 404, description = "No such item")
    ),
    security(("session_token" = []))
)]
pub async fn get_item_handler(
    State(state): State<AppState>,
    _session: SessionUser,
    Path(id): Path<String>,
) -> Result<Json<Item>, ApiError> {
    let item = state
        .items
        .get(state.deadline(), &id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Item '{}' not found", id)))?;

    Ok(Json(item))
}

/// Create an item owned by the caller
#[utoipa::path(
    post,
    path = "/items/",
    tag = "Items",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item created with count 0", body = Item),
        (status = 400, description = "Malformed request body"),
        (status = 401, description = "Missing or invalid session token, or unknown caller")
    ),
    security(("session_token" = []))
)]
pub async fn create_item_handler(
    State(state): State<AppState>,
    session: SessionUser,
    JsonBody(request): JsonBody<CreateItemRequest>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let owner = state
        .users
        .get_by_username(state.deadline(), &session.username)
        .await?
        .ok_or_else(|| {
            ApiError::auth_error(
                "AUTH_USER_NOT_FOUND",
                "Valid token but user not found in store",
            )
        })?;

    let item = Item::new(request.name, owner.id);
    state.items.create(state.deadline(), &item).await?;

    tracing::info!(item_id = %item.id, user_id = %item.user_id, "Item created");
    Ok((StatusCode::CREATED, Json(item)))
}

/// Replace an item's name and count
///
/// The owner never changes. Updating an unknown id succeeds.
#[utoipa::path(
    put,
    path = "/items/{id}",
    tag = "Items",
    params(("id" = String, Path, description = "Item identifier")),
    request_body = UpdateItem,
    responses(
        (status = 200, description = "Update applied", body = UpdatedItemResponse),
        (status = 400, description = "Malformed request body"),
        (status = 401, description = "Missing or invalid session token")
    ),
    security(("session_token" = []))
)]
pub async fn update_item_handler(
    State(state): State<AppState>,
    _session: SessionUser,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<UpdateItem>,
) -> Result<Json<UpdatedItemResponse>, ApiError> {
    let affected = state.items.update(state.deadline(), &id, &request).await?;
    if !affected {
        tracing::info!(item_id = %id, "Update matched no item");
    }

    Ok(Json(UpdatedItemResponse {
        id,
        name: request.name,
        count: request.count,
    }))
}

/// Delete an item
#[utoipa::path(
    delete,
    path = "/items/{id}",
    tag = "Items",
    params(("id" = String, Path, description = "Item identifier")),
    responses(
        (status = 204, description = "Item removed (or never existed)"),
        (status = 401, description = "Missing or invalid session token")
    ),
    security(("session_token" = []))
)]
pub async fn delete_item_handler(
    State(state): State<AppState>,
    session: SessionUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.items.delete(state.deadline(), &id).await?;
    tracing::info!(item_id = %id, username = %session.username, "Item deleted");
    Ok(StatusCode::NO_CONTENT)
}
