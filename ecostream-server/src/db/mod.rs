//! Record stores for users and items
//!
//! Contains entities, repositories, and the two storage backends: PostgreSQL
//! (relational) and a key-value store (Redis, or in-memory for development).

pub mod error;
pub mod item;
pub mod kv;
pub mod postgres;
pub mod user;

pub use error::StoreError;
pub use item::{Item, ItemRepository, UpdateItem};
pub use kv::KeyValueStore;
pub use postgres::PostgresStore;
pub use user::{UpdateUser, User, UserRepository, UserResponse};

/// Backend selected at startup, shared by every repository
#[derive(Debug)]
pub enum StoreBackend {
    /// PostgreSQL connection pool
    Postgres(PostgresStore),
    /// Hash-per-collection store
    KeyValue(KeyValueStore),
}

impl StoreBackend {
    /// Short label used in logs and the readiness report
    pub fn name(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::KeyValue(kv) if kv.is_persistent() => "redis",
            Self::KeyValue(_) => "memory",
        }
    }

    /// Check backend connectivity
    pub async fn check_health(&self) -> Result<(), StoreError> {
        match self {
            Self::Postgres(pg) => pg.check_health().await,
            Self::KeyValue(kv) => kv.check_health().await,
        }
    }
}
