//! User entity and repository

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{StoreBackend, StoreError};
use crate::deadline::Deadline;

fn default_active() -> bool {
    true
}

/// User entity as persisted by either backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    /// Argon2 PHC string; `None` for accounts that cannot log in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl User {
    /// New active user with a freshly generated identifier
    pub fn new(username: impl Into<String>, password_hash: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            username: username.into(),
            password_hash,
            is_active: true,
        }
    }
}

/// DTO for replacing a user's mutable fields
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = true)]
    pub is_active: bool,
}

/// User response DTO (excludes credentials)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// User unique identifier
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: String,
    #[schema(example = "alice")]
    pub username: String,
    pub is_active: bool,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            is_active: user.is_active,
        }
    }
}

/// Repository for user operations over the configured backend
#[derive(Clone)]
pub struct UserRepository {
    backend: Arc<StoreBackend>,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(backend: Arc<StoreBackend>) -> Self {
        Self { backend }
    }

    /// All users in the backend's canonical order.
    ///
    /// PostgreSQL orders by primary key; the key-value backend orders by username.
    pub async fn list(&self, deadline: Deadline) -> Result<Vec<User>, StoreError> {
        match self.backend.as_ref() {
            StoreBackend::Postgres(pg) => deadline.run("users.list", pg.list_users()).await,
            StoreBackend::KeyValue(kv) => deadline.run("users.list", kv.list_users()).await,
        }
    }

    /// Find user by ID
    pub async fn get(&self, deadline: Deadline, id: &str) -> Result<Option<User>, StoreError> {
        match self.backend.as_ref() {
            StoreBackend::Postgres(pg) => deadline.run("users.get", pg.get_user(id)).await,
            StoreBackend::KeyValue(kv) => deadline.run("users.get", kv.get_user(id)).await,
        }
    }

    /// Find user by username
    pub async fn get_by_username(
        &self,
        deadline: Deadline,
        username: &str,
    ) -> Result<Option<User>, StoreError> {
        match self.backend.as_ref() {
            StoreBackend::Postgres(pg) => {
                deadline
                    .run("users.get_by_username", pg.get_user_by_username(username))
                    .await
            }
            StoreBackend::KeyValue(kv) => {
                deadline
                    .run("users.get_by_username", kv.get_user_by_username(username))
                    .await
            }
        }
    }

    /// Persist a new user; fails with `Duplicate` on a taken id or username
    pub async fn create(&self, deadline: Deadline, user: &User) -> Result<(), StoreError> {
        match self.backend.as_ref() {
            StoreBackend::Postgres(pg) => deadline.run("users.create", pg.insert_user(user)).await,
            StoreBackend::KeyValue(kv) => deadline.run("users.create", kv.insert_user(user)).await,
        }
    }

    /// Replace username and active flag.
    ///
    /// Returns whether a user was affected; a missing id is not an error and
    /// never creates a record.
    pub async fn update(
        &self,
        deadline: Deadline,
        id: &str,
        input: &UpdateUser,
    ) -> Result<bool, StoreError> {
        match self.backend.as_ref() {
            StoreBackend::Postgres(pg) => {
                deadline.run("users.update", pg.update_user(id, input)).await
            }
            StoreBackend::KeyValue(kv) => {
                deadline.run("users.update", kv.update_user(id, input)).await
            }
        }
    }

    /// Remove a user; removing an absent id succeeds
    pub async fn delete(&self, deadline: Deadline, id: &str) -> Result<(), StoreError> {
        match self.backend.as_ref() {
            StoreBackend::Postgres(pg) => deadline.run("users.delete", pg.delete_user(id)).await,
            StoreBackend::KeyValue(kv) => deadline.run("users.delete", kv.delete_user(id)).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::time::Duration;

    use crate::db::KeyValueStore;

    fn deadline() -> Deadline {
        Deadline::after(Duration::from_secs(5))
    }

    fn memory_repo() -> UserRepository {
        UserRepository::new(Arc::new(StoreBackend::KeyValue(KeyValueStore::in_memory())))
    }

    #[test]
    fn test_new_users_get_distinct_ids() {
        let ids: HashSet<String> = (0..100).map(|_| User::new("u", None).id).collect();
        assert_eq!(ids.len(), 100);
        assert!(ids.iter().all(|id| !id.is_empty()));
    }

    #[test]
    fn test_user_response_hides_password_hash() {
        let user = User::new("alice", Some("$argon2id$hash".to_string()));
        let json = serde_json::to_value(UserResponse::from(user.clone())).unwrap();

        assert_eq!(json["id"], user.id.as_str());
        assert_eq!(json["username"], "alice");
        assert_eq!(json["isActive"], true);
        assert!(json.get("passwordHash").is_none());
    }

    #[test]
    fn test_stored_user_without_active_flag_defaults_to_active() {
        let user: User = serde_json::from_str(r#"{"id":"1","username":"bob"}"#).unwrap();
        assert!(user.is_active);
        assert!(user.password_hash.is_none());
    }

    #[tokio::test]
    async fn test_list_sorted_by_username() {
        let repo = memory_repo();
        assert!(repo.list(deadline()).await.unwrap().is_empty());

        for name in ["mallory", "alice", "trent", "bob"] {
            repo.create(deadline(), &User::new(name, None)).await.unwrap();
        }

        let names: Vec<String> = repo
            .list(deadline())
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, vec!["alice", "bob", "mallory", "trent"]);
    }

    #[tokio::test]
    async fn test_get_and_get_by_username() {
        let repo = memory_repo();
        let user = User::new("alice", None);
        repo.create(deadline(), &user).await.unwrap();

        assert_eq!(repo.get(deadline(), &user.id).await.unwrap(), Some(user.clone()));
        assert_eq!(
            repo.get_by_username(deadline(), "alice").await.unwrap(),
            Some(user)
        );
        assert_eq!(repo.get(deadline(), "missing").await.unwrap(), None);
        assert_eq!(repo.get_by_username(deadline(), "nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates() {
        let repo = memory_repo();
        let user = User::new("alice", None);
        repo.create(deadline(), &user).await.unwrap();

        let same_id = repo.create(deadline(), &user).await.unwrap_err();
        assert!(matches!(same_id, StoreError::Duplicate(_)));

        let same_name = repo
            .create(deadline(), &User::new("alice", None))
            .await
            .unwrap_err();
        assert!(matches!(same_name, StoreError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_update_replaces_fields_and_keeps_password() {
        let repo = memory_repo();
        let user = User::new("alice", Some("hash".to_string()));
        repo.create(deadline(), &user).await.unwrap();

        let input = UpdateUser {
            username: "alicia".to_string(),
            is_active: false,
        };
        assert!(repo.update(deadline(), &user.id, &input).await.unwrap());

        let stored = repo.get(deadline(), &user.id).await.unwrap().unwrap();
        assert_eq!(stored.username, "alicia");
        assert!(!stored.is_active);
        assert_eq!(stored.password_hash.as_deref(), Some("hash"));
    }

    #[tokio::test]
    async fn test_update_missing_user_is_not_created() {
        let repo = memory_repo();
        let input = UpdateUser {
            username: "ghost".to_string(),
            is_active: true,
        };

        assert!(!repo.update(deadline(), "missing", &input).await.unwrap());
        assert!(repo.get(deadline(), "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let repo = memory_repo();
        let user = User::new("alice", None);
        repo.create(deadline(), &user).await.unwrap();

        repo.delete(deadline(), &user.id).await.unwrap();
        repo.delete(deadline(), &user.id).await.unwrap();
        repo.delete(deadline(), "never-existed").await.unwrap();
        assert!(repo.get(deadline(), &user.id).await.unwrap().is_none());
    }
}
