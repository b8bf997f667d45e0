//! In-process object store (development and tests)

use bytes::Bytes;
use dashmap::DashMap;

use super::{ObjectStoreError, StoredObject};

/// Objects held in memory, keyed by object key
#[derive(Debug)]
pub struct MemoryObjectStore {
    bucket: String,
    objects: DashMap<String, (Bytes, String)>,
}

impl MemoryObjectStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: DashMap::new(),
        }
    }

    /// Bucket name reported for stored objects
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), ObjectStoreError> {
        self.objects
            .insert(key.to_string(), (data, content_type.to_string()));
        Ok(())
    }

    pub async fn get(&self, key: &str) -> Result<StoredObject, ObjectStoreError> {
        let entry = self
            .objects
            .get(key)
            .ok_or_else(|| ObjectStoreError::NotFound(key.to_string()))?;
        let (data, content_type) = entry.value();

        Ok(StoredObject {
            key: key.to_string(),
            data: data.clone(),
            content_type: content_type.clone(),
        })
    }
}
