//! Error types for the record stores.

use bb8_redis::{bb8, redis};
use thiserror::Error;

use crate::deadline::DeadlineExceeded;

/// Errors that can occur when interacting with the user and item stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backing store unreachable or connection pool exhausted
    #[error("Store connection error: {0}")]
    Connection(String),

    /// Migration execution failed
    #[error("Migration error: {0}")]
    Migration(String),

    /// Query or command execution failed
    #[error("Query error: {0}")]
    Query(String),

    /// A record with the same identifier or username already exists
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// Stored record could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The call did not finish before its deadline
    #[error("Store call '{0}' exceeded its deadline")]
    Timeout(&'static str),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                Self::Duplicate(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                Self::Connection(e.to_string())
            }
            other => Self::Query(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::Migration(e.to_string())
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        Self::Query(e.to_string())
    }
}

impl From<bb8::RunError<redis::RedisError>> for StoreError {
    fn from(e: bb8::RunError<redis::RedisError>) -> Self {
        if let bb8::RunError::User(inner) = e {
            Self::Connection(inner.to_string())
        } else {
            Self::Connection("Timed out waiting for a Redis connection".to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<DeadlineExceeded> for StoreError {
    fn from(e: DeadlineExceeded) -> Self {
        Self::Timeout(e.0)
    }
}
