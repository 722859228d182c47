//! Storage Abstraction
//!
//! Provides a unified interface for file storage backends.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Metadata returned by a successful store operation
#[derive(Debug, Clone)]
pub struct FileMetadata {
    /// Object size in bytes
    pub size: u64,
    /// Content type (MIME)
    pub content_type: String,
    /// SHA-256 digest of the stored bytes
    pub digest: String,
    /// Last modified time
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
}

/// Storage trait - unified interface for storage backends
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store data under a key
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<FileMetadata>;

    /// Retrieve data by key
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Delete data by key; `NotFound` when the key does not exist
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Check if a key exists
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Resolve a key to an absolute URL
    async fn url(&self, key: &str) -> StorageResult<String>;

    /// Resolve a key to a filesystem path. Only meaningful for local
    /// backends; remote backends return an opaque `scheme:key` form.
    fn absolute_path(&self, key: &str) -> StorageResult<String>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Reject keys that escape the storage root
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.contains("..") || key.starts_with('/') || key.starts_with('\\') {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Join a destination directory and filename into a storage key.
/// An empty directory yields the bare filename.
pub fn join_key(dir: &str, filename: &str) -> String {
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        filename.to_string()
    } else {
        format!("{}/{}", dir, filename)
    }
}

/// Guess a content type from a key's extension
pub(crate) fn guess_content_type(key: &str) -> String {
    mime_guess::from_path(key)
        .first_or_octet_stream()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_key() {
        assert_eq!(join_key("avatars", "a.png"), "avatars/a.png");
        assert_eq!(join_key("", "a.png"), "a.png");
        assert_eq!(join_key("a/b/", "c.png"), "a/b/c.png");
    }

    #[test]
    fn test_validate_key_rejects_traversal() {
        assert!(validate_key("../../etc/passwd").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("").is_err());
        assert!(validate_key("avatars/a.png").is_ok());
    }
}
