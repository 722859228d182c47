//! In-memory storage backend for testing

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use crate::backend::{
    guess_content_type, validate_key, FileMetadata, Storage, StorageError, StorageResult,
};
use crate::hash;

/// In-memory storage for testing
pub struct MemoryStorage {
    objects: RwLock<HashMap<String, (Bytes, FileMetadata)>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<FileMetadata> {
        validate_key(key)?;

        let metadata = FileMetadata {
            size: data.len() as u64,
            content_type: guess_content_type(key),
            digest: hash::digest(&data),
            last_modified: Some(chrono::Utc::now()),
        };

        let mut objects = self.objects.write().await;
        objects.insert(key.to_string(), (data, metadata.clone()));

        Ok(metadata)
    }

    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let objects = self.objects.read().await;
        objects
            .get(key)
            .map(|(data, _)| data.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let mut objects = self.objects.write().await;
        objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let objects = self.objects.read().await;
        Ok(objects.contains_key(key))
    }

    async fn url(&self, key: &str) -> StorageResult<String> {
        validate_key(key)?;
        Ok(format!("memory://{}", key))
    }

    fn absolute_path(&self, key: &str) -> StorageResult<String> {
        validate_key(key)?;
        Ok(format!("memory:{}", key))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
