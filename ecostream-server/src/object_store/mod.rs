//! Object store gateway for uploaded files
//!
//! Files are opaque bytes stored under their filename in one bucket. A later
//! upload with the same key replaces the earlier object.

pub mod error;
pub mod memory;
pub mod s3;

pub use error::ObjectStoreError;
pub use memory::MemoryObjectStore;
pub use s3::S3ObjectStore;

use bytes::Bytes;

use crate::deadline::Deadline;
use crate::validation::{validate_content_type, validate_object_key};

/// Object returned by a download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub data: Bytes,
    /// Content type recorded at upload (empty when the store kept none)
    pub content_type: String,
}

/// Object store backend selected at startup
#[derive(Debug)]
pub enum ObjectStore {
    /// S3-compatible server (MinIO)
    S3(S3ObjectStore),
    /// In-memory objects (development fallback)
    Memory(MemoryObjectStore),
}

impl ObjectStore {
    /// Create an in-memory object store reporting `bucket`
    pub fn in_memory(bucket: impl Into<String>) -> Self {
        Self::Memory(MemoryObjectStore::new(bucket))
    }

    /// Bucket holding uploaded files
    pub fn bucket(&self) -> &str {
        match self {
            Self::S3(s3) => s3.bucket(),
            Self::Memory(mem) => mem.bucket(),
        }
    }

    /// Make sure the bucket exists (no-op for memory backend)
    pub async fn ensure_bucket(&self, deadline: Deadline) -> Result<(), ObjectStoreError> {
        match self {
            Self::S3(s3) => deadline.run("objects.ensure_bucket", s3.ensure_bucket()).await,
            Self::Memory(_) => Ok(()),
        }
    }

    /// Store `data` under `key`, replacing any existing object
    pub async fn upload(
        &self,
        deadline: Deadline,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        validate_object_key(key).map_err(|e| ObjectStoreError::InvalidInput(e.to_string()))?;
        validate_content_type(content_type)
            .map_err(|e| ObjectStoreError::InvalidInput(e.to_string()))?;

        match self {
            Self::S3(s3) => deadline.run("objects.upload", s3.put(key, data, content_type)).await,
            Self::Memory(mem) => {
                deadline
                    .run("objects.upload", mem.put(key, data, content_type))
                    .await
            }
        }
    }

    /// Fetch the object stored under `key`
    pub async fn download(
        &self,
        deadline: Deadline,
        key: &str,
    ) -> Result<StoredObject, ObjectStoreError> {
        validate_object_key(key).map_err(|e| ObjectStoreError::InvalidInput(e.to_string()))?;

        match self {
            Self::S3(s3) => deadline.run("objects.download", s3.get(key)).await,
            Self::Memory(mem) => deadline.run("objects.download", mem.get(key)).await,
        }
    }
}
