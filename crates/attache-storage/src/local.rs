//! Local filesystem storage backend

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, instrument};

use crate::backend::{
    guess_content_type, validate_key, FileMetadata, Storage, StorageError, StorageResult,
};
use crate::hash;

/// Local filesystem storage
pub struct LocalStorage {
    /// Root directory for storage
    root: PathBuf,
    /// Base URL for generating URLs
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage rooted at `root`, resolving URLs
    /// against `base_url`.
    pub fn new(root: impl AsRef<Path>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            base_url: base_url.into(),
        }
    }

    /// Create storage under a temp directory (tests and local dev)
    pub fn temp() -> std::io::Result<Self> {
        let dir = std::env::temp_dir().join("attache-storage");
        std::fs::create_dir_all(&dir)?;
        Ok(Self::new(dir, "http://localhost/attachments"))
    }

    /// Resolve a key to a full path
    fn resolve_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }

    /// Ensure parent directory exists
    async fn ensure_parent(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    #[instrument(skip(self, data), fields(storage = "local"))]
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<FileMetadata> {
        let path = self.resolve_path(key)?;
        self.ensure_parent(&path).await?;

        let digest = hash::digest(&data);
        let size = data.len() as u64;
        let content_type = guess_content_type(key);

        let mut file = fs::File::create(&path).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;

        debug!(path = ?path, size = size, "object stored");

        Ok(FileMetadata {
            size,
            content_type,
            digest,
            last_modified: Some(chrono::Utc::now()),
        })
    }

    #[instrument(skip(self), fields(storage = "local"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let path = self.resolve_path(key)?;

        if !path.exists() {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let mut file = fs::File::open(&path).await?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer).await?;

        Ok(Bytes::from(buffer))
    }

    #[instrument(skip(self), fields(storage = "local"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.resolve_path(key)?;

        if !path.exists() {
            return Err(StorageError::NotFound(key.to_string()));
        }

        fs::remove_file(&path).await?;
        debug!(path = ?path, "object deleted");
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.resolve_path(key)?;
        Ok(path.exists())
    }

    async fn url(&self, key: &str) -> StorageResult<String> {
        validate_key(key)?;
        Ok(format!("{}/{}", self.base_url.trim_end_matches('/'), key))
    }

    fn absolute_path(&self, key: &str) -> StorageResult<String> {
        let path = self.resolve_path(key)?;
        Ok(path.display().to_string())
    }

    fn name(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_storage() -> LocalStorage {
        let dir = std::env::temp_dir()
            .join("attache-storage-test")
            .join(hash::random_token(16));
        std::fs::create_dir_all(&dir).unwrap();
        LocalStorage::new(dir, "http://localhost/attachments")
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let storage = unique_storage();
        let data = Bytes::from("local bytes");

        let meta = storage.put("dir/file.txt", data.clone()).await.unwrap();
        assert_eq!(meta.size, 11);

        let retrieved = storage.get("dir/file.txt").await.unwrap();
        assert_eq!(retrieved, data);
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let storage = unique_storage();
        let result = storage.delete("nope.txt").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let storage = LocalStorage::temp().unwrap();
        let result = storage.get("../../../etc/passwd").await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_url_is_absolute() {
        let storage = unique_storage();
        let url = storage.url("a/b.png").await.unwrap();
        assert_eq!(url, "http://localhost/attachments/a/b.png");
    }

    #[tokio::test]
    async fn test_absolute_path_under_root() {
        let storage = unique_storage();
        storage.put("x.bin", Bytes::from_static(&[1, 2])).await.unwrap();
        let path = storage.absolute_path("x.bin").unwrap();
        assert!(path.ends_with("x.bin"));
        assert!(std::path::Path::new(&path).exists());
    }
}
