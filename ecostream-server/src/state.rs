//! Application state module
//!
//! Defines shared state accessible across all request handlers, and the
//! startup sequence that connects the configured backends.

use std::sync::Arc;

use crate::auth::{hash_password, SessionKeys, StaticToken};
use crate::config::{Config, ObjectBackendKind, StoreBackendKind};
use crate::db::{ItemRepository, KeyValueStore, PostgresStore, StoreBackend, User, UserRepository};
use crate::deadline::Deadline;
use crate::error::ApiError;
use crate::object_store::{ObjectStore, S3ObjectStore};

/// Application state containing shared resources.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Record backend shared by both repositories
    pub store: Arc<StoreBackend>,
    pub users: UserRepository,
    pub items: ItemRepository,
    pub objects: Arc<ObjectStore>,
    pub session_keys: Arc<SessionKeys>,
    pub static_token: Arc<StaticToken>,
}

impl AppState {
    /// Assemble state from already-connected backends
    pub fn new(config: Config, store: StoreBackend, objects: ObjectStore) -> Self {
        let store = Arc::new(store);
        Self {
            session_keys: Arc::new(SessionKeys::new(config.jwt_secret.reveal().as_bytes())),
            static_token: Arc::new(StaticToken::new(config.secret_token.clone())),
            users: UserRepository::new(store.clone()),
            items: ItemRepository::new(store.clone()),
            store,
            objects: Arc::new(objects),
            config: Arc::new(config),
        }
    }

    /// State over in-memory backends (tests and local development)
    pub fn in_memory(config: Config) -> Self {
        let objects = ObjectStore::in_memory(config.bucket.clone());
        Self::new(
            config,
            StoreBackend::KeyValue(KeyValueStore::in_memory()),
            objects,
        )
    }

    /// Connect the backends named in `config`.
    ///
    /// Runs migrations (PostgreSQL) and creates the bucket (MinIO). Any failure
    /// here is fatal for startup.
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let store = match config.store_backend {
            StoreBackendKind::Postgres => {
                let pg = PostgresStore::connect(
                    config.postgres_url.reveal(),
                    config.database_max_connections,
                    config.database_min_connections,
                )
                .await?;
                pg.migrate().await?;
                StoreBackend::Postgres(pg)
            }
            StoreBackendKind::Redis => StoreBackend::KeyValue(
                KeyValueStore::connect(config.redis_url.reveal(), config.redis_pool_size).await?,
            ),
            StoreBackendKind::Memory => {
                tracing::warn!("Record store: in-memory, data is lost on restart");
                StoreBackend::KeyValue(KeyValueStore::in_memory())
            }
        };

        let objects = match config.object_backend {
            ObjectBackendKind::Minio => ObjectStore::S3(S3ObjectStore::from_config(&config).await),
            ObjectBackendKind::Memory => {
                tracing::warn!("Object store: in-memory, files are lost on restart");
                ObjectStore::in_memory(config.bucket.clone())
            }
        };

        let state = Self::new(config, store, objects);
        state.objects.ensure_bucket(state.deadline()).await?;

        tracing::info!(
            store = state.store.name(),
            bucket = state.objects.bucket(),
            "Backends ready"
        );
        Ok(state)
    }

    /// Fresh deadline for one store call
    pub fn deadline(&self) -> Deadline {
        Deadline::after(self.config.store_timeout())
    }

    /// Create the administrator account unless a user with that name exists
    pub async fn seed_admin(&self) -> Result<(), ApiError> {
        if !self.config.seed_admin {
            return Ok(());
        }

        let username = &self.config.admin_username;
        if self
            .users
            .get_by_username(self.deadline(), username)
            .await?
            .is_some()
        {
            tracing::debug!(username = %username, "Admin account already present");
            return Ok(());
        }

        let hash = hash_password(self.config.admin_password.reveal())?;
        let admin = User::new(username.clone(), Some(hash));
        self.users.create(self.deadline(), &admin).await?;

        tracing::info!(username = %username, user_id = %admin.id, "Seeded admin account");
        Ok(())
    }
}
