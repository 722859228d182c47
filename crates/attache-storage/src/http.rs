//! Remote object storage over plain HTTP
//!
//! Speaks PUT/GET/HEAD/DELETE against an object endpoint, which covers
//! S3-compatible gateways and simple blob servers alike. Object bytes are
//! addressed as `{endpoint}/{key}`; public URLs resolve against a separate
//! base so a CDN can front the store.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use tracing::{debug, instrument};

use crate::backend::{
    guess_content_type, validate_key, FileMetadata, Storage, StorageError, StorageResult,
};
use crate::hash;

/// Remote HTTP storage configuration
#[derive(Debug, Clone)]
pub struct HttpStorageConfig {
    /// Object endpoint requests are issued against
    pub endpoint: String,
    /// Base for publicly resolvable URLs; falls back to `endpoint`
    pub public_base: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for HttpStorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9000/attachments".to_string(),
            public_base: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Remote object storage backend
pub struct HttpStorage {
    client: reqwest::Client,
    config: HttpStorageConfig,
}

impl HttpStorage {
    pub fn new(config: HttpStorageConfig) -> StorageResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.config.endpoint.trim_end_matches('/'), key)
    }

    fn public_url(&self, key: &str) -> String {
        let base = self
            .config
            .public_base
            .as_deref()
            .unwrap_or(&self.config.endpoint);
        format!("{}/{}", base.trim_end_matches('/'), key)
    }
}

fn backend_err(e: reqwest::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

/// Map a HEAD status to an existence answer. Only 404 means "absent";
/// any other non-success status is a backend failure, not a missing
/// object.
fn existence_from_status(key: &str, status: StatusCode) -> StorageResult<bool> {
    match status {
        StatusCode::NOT_FOUND => Ok(false),
        status if status.is_success() => Ok(true),
        status => Err(StorageError::Backend(format!(
            "head {} returned {}",
            key, status
        ))),
    }
}

#[async_trait]
impl Storage for HttpStorage {
    #[instrument(skip(self, data), fields(storage = "http"))]
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<FileMetadata> {
        validate_key(key)?;

        let digest = hash::digest(&data);
        let size = data.len() as u64;
        let content_type = guess_content_type(key);

        let response = self
            .client
            .put(self.object_url(key))
            .header(reqwest::header::CONTENT_TYPE, &content_type)
            .body(data)
            .send()
            .await
            .map_err(backend_err)?;

        if !response.status().is_success() {
            return Err(StorageError::Backend(format!(
                "put {} returned {}",
                key,
                response.status()
            )));
        }

        debug!(key = key, size = size, "object stored");

        Ok(FileMetadata {
            size,
            content_type,
            digest,
            last_modified: Some(chrono::Utc::now()),
        })
    }

    #[instrument(skip(self), fields(storage = "http"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        validate_key(key)?;

        let response = self
            .client
            .get(self.object_url(key))
            .send()
            .await
            .map_err(backend_err)?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(key.to_string())),
            status if status.is_success() => response.bytes().await.map_err(backend_err),
            status => Err(StorageError::Backend(format!(
                "get {} returned {}",
                key, status
            ))),
        }
    }

    #[instrument(skip(self), fields(storage = "http"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;

        let response = self
            .client
            .delete(self.object_url(key))
            .send()
            .await
            .map_err(backend_err)?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(key.to_string())),
            status if status.is_success() => Ok(()),
            status => Err(StorageError::Backend(format!(
                "delete {} returned {}",
                key, status
            ))),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;

        let response = self
            .client
            .head(self.object_url(key))
            .send()
            .await
            .map_err(backend_err)?;

        existence_from_status(key, response.status())
    }

    async fn url(&self, key: &str) -> StorageResult<String> {
        validate_key(key)?;
        Ok(self.public_url(key))
    }

    fn absolute_path(&self, key: &str) -> StorageResult<String> {
        validate_key(key)?;
        // No filesystem behind a remote backend; opaque form only
        Ok(format!("remote:{}", key))
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_public_url_prefers_public_base() {
        let storage = HttpStorage::new(HttpStorageConfig {
            endpoint: "http://internal:9000/bucket".to_string(),
            public_base: Some("https://cdn.example.com".to_string()),
            timeout: Duration::from_secs(5),
        })
        .unwrap();

        let url = storage.url("a/b.png").await.unwrap();
        assert_eq!(url, "https://cdn.example.com/a/b.png");
    }

    #[tokio::test]
    async fn test_url_falls_back_to_endpoint() {
        let storage = HttpStorage::new(HttpStorageConfig::default()).unwrap();
        let url = storage.url("x.bin").await.unwrap();
        assert_eq!(url, "http://localhost:9000/attachments/x.bin");
    }

    #[tokio::test]
    async fn test_absolute_path_is_opaque() {
        let storage = HttpStorage::new(HttpStorageConfig::default()).unwrap();
        assert_eq!(storage.absolute_path("a/b").unwrap(), "remote:a/b");
    }

    #[test]
    fn test_existence_only_absent_on_404() {
        assert!(existence_from_status("k", StatusCode::OK).unwrap());
        assert!(!existence_from_status("k", StatusCode::NOT_FOUND).unwrap());

        for status in [
            StatusCode::FORBIDDEN,
            StatusCode::METHOD_NOT_ALLOWED,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            let result = existence_from_status("k", status);
            assert!(matches!(result, Err(StorageError::Backend(_))));
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_backend_error() {
        let storage = HttpStorage::new(HttpStorageConfig {
            endpoint: "http://bad.invalid/bucket".to_string(),
            public_base: None,
            timeout: Duration::from_secs(2),
        })
        .unwrap();

        let result = storage.get("x").await;
        assert!(matches!(result, Err(StorageError::Backend(_))));
    }
}
