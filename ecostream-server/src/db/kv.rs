//! Key-value backend for users and items
//!
//! Each collection is one hash (`users`, `items`) mapping record id to the
//! record's JSON encoding. A third hash, `usernames`, maps each username to the
//! id holding it; a username is claimed with `HSETNX` before it is written to a
//! user record. The hashes live in Redis, or in process memory when no Redis
//! server is configured (development and tests).
//!
//! Updates only replace a record that still exists, so a concurrent delete is
//! never undone. Orderings are applied at read time: users by username, items
//! by id.

use bb8_redis::bb8::Pool;
use bb8_redis::redis::{self, AsyncCommands};
use bb8_redis::RedisConnectionManager;
use dashmap::DashMap;

use super::{Item, StoreError, UpdateItem, UpdateUser, User};

/// Hash holding user records
pub const USERS_KEY: &str = "users";
/// Hash holding item records
pub const ITEMS_KEY: &str = "items";
/// Hash mapping usernames to user ids
pub const USERNAMES_KEY: &str = "usernames";

const HSET_IF_EXISTS: &str = "if redis.call('HEXISTS', KEYS[1], ARGV[1]) == 1 then \
    redis.call('HSET', KEYS[1], ARGV[1], ARGV[2]) return 1 end return 0";
const HSET_IF_EQ: &str = "if redis.call('HGET', KEYS[1], ARGV[1]) == ARGV[2] then \
    redis.call('HSET', KEYS[1], ARGV[1], ARGV[3]) return 1 end return 0";
const HDEL_IF_EQ: &str = "if redis.call('HGET', KEYS[1], ARGV[1]) == ARGV[2] then \
    return redis.call('HDEL', KEYS[1], ARGV[1]) end return 0";

/// Run a single-key script returning 1 when it applied its write
async fn eval_applied(
    pool: &Pool<RedisConnectionManager>,
    script: &str,
    key: &str,
    args: &[&str],
) -> Result<bool, StoreError> {
    let mut conn = pool.get().await?;
    let applied: i64 = redis::cmd("EVAL")
        .arg(script)
        .arg(1)
        .arg(key)
        .arg(args)
        .query_async(&mut *conn)
        .await?;
    Ok(applied == 1)
}

fn username_taken(username: &str) -> StoreError {
    StoreError::Duplicate(format!("username '{}' already exists", username))
}

/// Hash storage backend
enum HashBackend {
    /// Redis server (production)
    Redis(Pool<RedisConnectionManager>),
    /// In-memory hashes (development fallback)
    Memory(DashMap<String, DashMap<String, String>>),
}

/// Hash-per-collection record store
pub struct KeyValueStore {
    hashes: HashBackend,
}

impl KeyValueStore {
    /// Connect a Redis connection pool to `redis_url`
    pub async fn connect(redis_url: &str, pool_size: u32) -> Result<Self, StoreError> {
        let manager = RedisConnectionManager::new(redis_url)
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;

        tracing::info!("Connected to Redis");
        Ok(Self {
            hashes: HashBackend::Redis(pool),
        })
    }

    /// Create an in-memory store (development only)
    pub fn in_memory() -> Self {
        Self {
            hashes: HashBackend::Memory(DashMap::new()),
        }
    }

    /// Check if using persistent storage
    pub fn is_persistent(&self) -> bool {
        matches!(self.hashes, HashBackend::Redis(_))
    }

    /// Check Redis health (always Ok for memory backend)
    pub async fn check_health(&self) -> Result<(), StoreError> {
        match &self.hashes {
            HashBackend::Redis(pool) => {
                let mut conn = pool.get().await?;
                redis::cmd("PING").query_async::<String>(&mut *conn).await?;
                Ok(())
            }
            HashBackend::Memory(_) => Ok(()),
        }
    }

    // ==================== Hash primitives ====================

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>, StoreError> {
        match &self.hashes {
            HashBackend::Redis(pool) => {
                let mut conn = pool.get().await?;
                let value: Option<String> = conn.hget(key, field).await?;
                Ok(value)
            }
            HashBackend::Memory(map) => Ok(map
                .get(key)
                .and_then(|hash| hash.get(field).map(|v| v.value().clone()))),
        }
    }

    async fn hvals(&self, key: &str) -> Result<Vec<String>, StoreError> {
        match &self.hashes {
            HashBackend::Redis(pool) => {
                let mut conn = pool.get().await?;
                let values: Vec<String> = conn.hvals(key).await?;
                Ok(values)
            }
            HashBackend::Memory(map) => Ok(map
                .get(key)
                .map(|hash| hash.iter().map(|entry| entry.value().clone()).collect())
                .unwrap_or_default()),
        }
    }

    /// Set `field` only when absent; returns whether it was written
    async fn hset_nx(&self, key: &str, field: &str, value: String) -> Result<bool, StoreError> {
        match &self.hashes {
            HashBackend::Redis(pool) => {
                let mut conn = pool.get().await?;
                let written: bool = conn.hset_nx(key, field, value).await?;
                Ok(written)
            }
            HashBackend::Memory(map) => {
                let hash = map.entry(key.to_string()).or_default();
                let written = match hash.entry(field.to_string()) {
                    dashmap::mapref::entry::Entry::Occupied(_) => false,
                    dashmap::mapref::entry::Entry::Vacant(slot) => {
                        slot.insert(value);
                        true
                    }
                };
                Ok(written)
            }
        }
    }

    /// Replace `field` only when it is present
    async fn hset_if_exists(
        &self,
        key: &str,
        field: &str,
        value: String,
    ) -> Result<bool, StoreError> {
        match &self.hashes {
            HashBackend::Redis(pool) => {
                eval_applied(pool, HSET_IF_EXISTS, key, &[field, value.as_str()]).await
            }
            HashBackend::Memory(map) => {
                let Some(hash) = map.get(key) else {
                    return Ok(false);
                };
                let written = match hash.get_mut(field) {
                    Some(mut current) => {
                        *current = value;
                        true
                    }
                    None => false,
                };
                Ok(written)
            }
        }
    }

    /// Replace `field` only while it still holds `expected`
    async fn hset_if_eq(
        &self,
        key: &str,
        field: &str,
        expected: &str,
        value: String,
    ) -> Result<bool, StoreError> {
        match &self.hashes {
            HashBackend::Redis(pool) => {
                eval_applied(pool, HSET_IF_EQ, key, &[field, expected, value.as_str()]).await
            }
            HashBackend::Memory(map) => {
                let Some(hash) = map.get(key) else {
                    return Ok(false);
                };
                let written = match hash.get_mut(field) {
                    Some(mut current) if current.as_str() == expected => {
                        *current = value;
                        true
                    }
                    _ => false,
                };
                Ok(written)
            }
        }
    }

    async fn hdel(&self, key: &str, field: &str) -> Result<(), StoreError> {
        match &self.hashes {
            HashBackend::Redis(pool) => {
                let mut conn = pool.get().await?;
                let _: () = conn.hdel(key, field).await?;
                Ok(())
            }
            HashBackend::Memory(map) => {
                if let Some(hash) = map.get(key) {
                    hash.remove(field);
                }
                Ok(())
            }
        }
    }

    /// Remove `field` only while it still holds `expected`
    async fn hdel_if_eq(&self, key: &str, field: &str, expected: &str) -> Result<bool, StoreError> {
        match &self.hashes {
            HashBackend::Redis(pool) => {
                eval_applied(pool, HDEL_IF_EQ, key, &[field, expected]).await
            }
            HashBackend::Memory(map) => Ok(map
                .get(key)
                .and_then(|hash| hash.remove_if(field, |_, current| current == expected))
                .is_some()),
        }
    }

    async fn get_record<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
        id: &str,
    ) -> Result<Option<T>, StoreError> {
        match self.hget(key, id).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn all_records<T: serde::de::DeserializeOwned>(
        &self,
        key: &str,
    ) -> Result<Vec<T>, StoreError> {
        self.hvals(key)
            .await?
            .iter()
            .map(|json| serde_json::from_str(json).map_err(StoreError::from))
            .collect()
    }

    // ==================== Users ====================

    pub async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.all_records(USERS_KEY).await?;
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.get_record(USERS_KEY, id).await
    }

    /// Looks the id up in the `usernames` hash.
    ///
    /// A claim can outlive a deleted user or precede a rename; only a record
    /// that carries the username matches.
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let Some(id) = self.hget(USERNAMES_KEY, username).await? else {
            return Ok(None);
        };
        Ok(self.get_user(&id).await?.filter(|user| user.username == username))
    }

    /// Reserve `username` for user `id`.
    ///
    /// A claim whose holder no longer exists is taken over. Records are written
    /// before their username is claimed, so a missing holder is a deleted user.
    async fn claim_username(&self, username: &str, id: &str) -> Result<(), StoreError> {
        if self.hset_nx(USERNAMES_KEY, username, id.to_string()).await? {
            return Ok(());
        }

        let Some(holder) = self.hget(USERNAMES_KEY, username).await? else {
            // Released in between
            return if self.hset_nx(USERNAMES_KEY, username, id.to_string()).await? {
                Ok(())
            } else {
                Err(username_taken(username))
            };
        };
        if holder == id {
            return Ok(());
        }

        if self.hget(USERS_KEY, &holder).await?.is_none()
            && self
                .hset_if_eq(USERNAMES_KEY, username, &holder, id.to_string())
                .await?
        {
            tracing::debug!(
                username = %username,
                stale_holder = %holder,
                "Took over stale username claim"
            );
            return Ok(());
        }

        Err(username_taken(username))
    }

    async fn release_username(&self, username: &str, id: &str) -> Result<(), StoreError> {
        self.hdel_if_eq(USERNAMES_KEY, username, id).await?;
        Ok(())
    }

    pub async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let json = serde_json::to_string(user)?;
        if !self.hset_nx(USERS_KEY, &user.id, json).await? {
            return Err(StoreError::Duplicate(format!(
                "user id '{}' already exists",
                user.id
            )));
        }

        if let Err(e) = self.claim_username(&user.username, &user.id).await {
            self.hdel(USERS_KEY, &user.id).await?;
            return Err(e);
        }
        Ok(())
    }

    pub async fn update_user(&self, id: &str, input: &UpdateUser) -> Result<bool, StoreError> {
        let Some(mut user) = self.get_user(id).await? else {
            return Ok(false);
        };

        let previous = std::mem::replace(&mut user.username, input.username.clone());
        let renamed = previous != user.username;
        if renamed {
            self.claim_username(&user.username, id).await?;
        }

        user.is_active = input.is_active;
        let written = self
            .hset_if_exists(USERS_KEY, id, serde_json::to_string(&user)?)
            .await?;

        match (written, renamed) {
            (false, true) => self.release_username(&user.username, id).await?,
            (true, true) => self.release_username(&previous, id).await?,
            _ => {}
        }
        Ok(written)
    }

    /// Items owned by the user are left in place
    pub async fn delete_user(&self, id: &str) -> Result<(), StoreError> {
        let user = self.get_user(id).await?;
        self.hdel(USERS_KEY, id).await?;
        if let Some(user) = user {
            self.release_username(&user.username, id).await?;
        }
        Ok(())
    }

    // ==================== Items ====================

    pub async fn list_items(&self, username: &str) -> Result<Vec<Item>, StoreError> {
        let Some(owner) = self.get_user_by_username(username).await? else {
            return Ok(Vec::new());
        };

        let mut items: Vec<Item> = self
            .all_records::<Item>(ITEMS_KEY)
            .await?
            .into_iter()
            .filter(|item| item.user_id == owner.id)
            .collect();
        items.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(items)
    }

    pub async fn get_item(&self, id: &str) -> Result<Option<Item>, StoreError> {
        self.get_record(ITEMS_KEY, id).await
    }

    pub async fn insert_item(&self, item: &Item) -> Result<(), StoreError> {
        let json = serde_json::to_string(item)?;
        if self.hset_nx(ITEMS_KEY, &item.id, json).await? {
            Ok(())
        } else {
            Err(StoreError::Duplicate(format!(
                "item id '{}' already exists",
                item.id
            )))
        }
    }

    pub async fn update_item(&self, id: &str, input: &UpdateItem) -> Result<bool, StoreError> {
        let Some(mut item) = self.get_item(id).await? else {
            return Ok(false);
        };

        item.name = input.name.clone();
        item.count = input.count;
        self.hset_if_exists(ITEMS_KEY, id, serde_json::to_string(&item)?)
            .await
    }

    pub async fn delete_item(&self, id: &str) -> Result<(), StoreError> {
        self.hdel(ITEMS_KEY, id).await
    }
}

impl std::fmt::Debug for KeyValueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match &self.hashes {
            HashBackend::Redis(_) => "Redis",
            HashBackend::Memory(_) => "Memory",
        };
        f.debug_struct("KeyValueStore")
            .field("backend", &backend)
            .finish()
    }
}
