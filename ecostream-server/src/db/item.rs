//! Item entity and repository
//!
//! Items belong to the user that created them. Ownership is fixed at creation:
//! no repository operation other than `create` writes `user_id`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{StoreBackend, StoreError};
use crate::deadline::Deadline;

/// Item entity as persisted by either backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[schema(example = "9b2c1d1e-8f5a-4c0e-a2d4-1b6f3e7a9c10")]
    pub id: String,
    #[schema(example = "compost bin")]
    pub name: String,
    pub count: i32,
    /// Owning user identifier
    pub user_id: String,
}

impl Item {
    /// New item with a generated identifier and a count of zero
    pub fn new(name: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            count: 0,
            user_id: user_id.into(),
        }
    }
}

/// DTO for replacing an item's mutable fields (the owner is not one of them)
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateItem {
    #[schema(example = "compost bin")]
    pub name: String,
    #[serde(default)]
    pub count: i32,
}

/// Repository for item operations over the configured backend
#[derive(Clone)]
pub struct ItemRepository {
    backend: Arc<StoreBackend>,
}

impl ItemRepository {
    /// Create a new item repository
    pub fn new(backend: Arc<StoreBackend>) -> Self {
        Self { backend }
    }

    /// Items owned by the user with `username`, ordered by item id ascending
    pub async fn list(&self, deadline: Deadline, username: &str) -> Result<Vec<Item>, StoreError> {
        match self.backend.as_ref() {
            StoreBackend::Postgres(pg) => deadline.run("items.list", pg.list_items(username)).await,
            StoreBackend::KeyValue(kv) => deadline.run("items.list", kv.list_items(username)).await,
        }
    }

    /// Find item by ID
    pub async fn get(&self, deadline: Deadline, id: &str) -> Result<Option<Item>, StoreError> {
        match self.backend.as_ref() {
            StoreBackend::Postgres(pg) => deadline.run("items.get", pg.get_item(id)).await,
            StoreBackend::KeyValue(kv) => deadline.run("items.get", kv.get_item(id)).await,
        }
    }

    /// Persist a new item
    pub async fn create(&self, deadline: Deadline, item: &Item) -> Result<(), StoreError> {
        match self.backend.as_ref() {
            StoreBackend::Postgres(pg) => deadline.run("items.create", pg.insert_item(item)).await,
            StoreBackend::KeyValue(kv) => deadline.run("items.create", kv.insert_item(item)).await,
        }
    }

    /// Replace name and count; returns whether an item was affected
    pub async fn update(
        &self,
        deadline: Deadline,
        id: &str,
        input: &UpdateItem,
    ) -> Result<bool, StoreError> {
        match self.backend.as_ref() {
            StoreBackend::Postgres(pg) => {
                deadline.run("items.update", pg.update_item(id, input)).await
            }
            StoreBackend::KeyValue(kv) => {
                deadline.run("items.update", kv.update_item(id, input)).await
            }
        }
    }

    /// Remove an item by id, whoever owns it
    pub async fn delete(&self, deadline: Deadline, id: &str) -> Result<(), StoreError> {
        match self.backend.as_ref() {
            StoreBackend::Postgres(pg) => deadline.run("items.delete", pg.delete_item(id)).await,
            StoreBackend::KeyValue(kv) => deadline.run("items.delete", kv.delete_item(id)).await,
        }
    }
}
