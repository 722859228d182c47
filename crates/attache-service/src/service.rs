//! Attachment Service
//!
//! Orchestrates uploads, remote-URL ingestion, crop derivation and
//! deletion across the backing store, the metadata repository and the
//! image transform service.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use attache_core::Id;
use bytes::Bytes;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use attache_storage::{hash, join_key, sniff, Storage, StorageError};
use attache_transform::{ImageTransformer, TransformError};

use crate::fetch::{FetchError, HttpFetcher, RemoteFetcher};
use crate::model::{Attachment, AttachmentWithUrl, NewAttachment, UploadedFile};
use crate::repository::{AttachmentRepository, RepositoryError};

/// Service errors
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("attachment not found: {0}")]
    NotFound(Id),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("transform error: {0}")]
    Transform(#[from] TransformError),
    #[error("remote fetch error: {0}")]
    Fetch(#[from] FetchError),
    #[error("staging file error: {0}")]
    Staging(#[from] std::io::Error),
    #[error("file too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: i64, max: i64 },
    #[error("content type not allowed: {0}")]
    InvalidContentType(String),
    #[error("attachment is not an image: {0}")]
    NotAnImage(String),
}

pub type AttachmentResult<T> = Result<T, AttachmentError>;

/// Allowed file types configuration
#[derive(Debug, Clone)]
pub struct AllowedFileTypes {
    /// Allowed MIME types (empty = allow all)
    pub allowed_mime_types: Vec<String>,
    /// Blocked MIME types
    pub blocked_mime_types: Vec<String>,
    /// Maximum file size in bytes
    pub max_file_size: i64,
}

impl Default for AllowedFileTypes {
    fn default() -> Self {
        Self {
            allowed_mime_types: Vec::new(),
            blocked_mime_types: vec![
                "application/x-msdownload".to_string(),
                "application/x-executable".to_string(),
            ],
            max_file_size: 100 * 1024 * 1024, // 100 MB
        }
    }
}

impl AllowedFileTypes {
    /// Check if a content type is allowed
    pub fn is_allowed(&self, content_type: &str) -> bool {
        if self.blocked_mime_types.iter().any(|t| t == content_type) {
            return false;
        }
        if self.allowed_mime_types.is_empty() {
            return true;
        }
        self.allowed_mime_types.iter().any(|t| t == content_type)
    }
}

/// Attachment service configuration
#[derive(Debug, Clone)]
pub struct AttachmentConfig {
    pub allowed_types: AllowedFileTypes,
    /// Timeout for remote-URL fetches
    pub fetch_timeout: Duration,
    /// Directory for remote-ingest staging files
    pub staging_dir: PathBuf,
    /// Length of random filename stems for remote-ingested objects
    pub token_length: usize,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            allowed_types: AllowedFileTypes::default(),
            fetch_timeout: Duration::from_secs(30),
            staging_dir: std::env::temp_dir(),
            token_length: 40,
        }
    }
}

/// Attachment service
///
/// Holds its collaborators by explicit injection: the metadata repository,
/// the backing store and the remote fetcher are passed at construction.
pub struct AttachmentService<R: AttachmentRepository, S: Storage, F: RemoteFetcher> {
    repo: Arc<R>,
    storage: Arc<S>,
    transformer: ImageTransformer<S>,
    fetcher: Arc<F>,
    config: AttachmentConfig,
}

impl<R: AttachmentRepository, S: Storage> AttachmentService<R, S, HttpFetcher> {
    /// Construct a service with the production HTTP fetcher, using the
    /// configured fetch timeout
    pub fn with_http_fetcher(
        repo: Arc<R>,
        storage: Arc<S>,
        config: AttachmentConfig,
    ) -> Result<Self, FetchError> {
        let fetcher = Arc::new(HttpFetcher::new(config.fetch_timeout)?);
        Ok(Self::new(repo, storage, fetcher, config))
    }
}

impl<R: AttachmentRepository, S: Storage, F: RemoteFetcher> AttachmentService<R, S, F> {
    pub fn new(repo: Arc<R>, storage: Arc<S>, fetcher: Arc<F>, config: AttachmentConfig) -> Self {
        let transformer = ImageTransformer::new(storage.clone());
        Self {
            repo,
            storage,
            transformer,
            fetcher,
            config,
        }
    }

    /// Store an uploaded file under `dir` and persist its record.
    ///
    /// The storage key is content-addressed: `dir/<digest>.<ext>`. Size and
    /// declared content type come from the uploaded file itself; a failed
    /// store write surfaces as an error without retry.
    #[instrument(skip(self, file), fields(filename = %file.name))]
    pub async fn upload(
        &self,
        dir: &str,
        file: UploadedFile,
        owner_id: Id,
    ) -> AttachmentResult<AttachmentWithUrl> {
        let size = file.size();
        if size > self.config.allowed_types.max_file_size {
            return Err(AttachmentError::FileTooLarge {
                size,
                max: self.config.allowed_types.max_file_size,
            });
        }

        let mime_type = file.content_type.clone().unwrap_or_else(|| {
            mime_guess::from_path(&file.name)
                .first_or_octet_stream()
                .to_string()
        });
        if !self.config.allowed_types.is_allowed(&mime_type) {
            return Err(AttachmentError::InvalidContentType(mime_type));
        }

        let digest = hash::digest(&file.data);
        let extension = file.extension().unwrap_or("").to_string();
        let filename = if extension.is_empty() {
            digest.clone()
        } else {
            format!("{}.{}", digest, extension)
        };
        let key = join_key(dir, &filename);

        // Content-addressed keys collide exactly when the bytes are already
        // stored under this directory; hand back the existing record
        if let Some(existing) = self.repo.find_by_path(&key).await? {
            if existing.content_hash == digest {
                debug!(id = existing.id, path = %key, "dedupe hit, reusing record");
                let url = self.storage.url(&key).await?;
                return Ok(AttachmentWithUrl::new(existing, url));
            }
        }

        self.storage.put(&key, file.data.clone()).await?;

        let attachment = self
            .repo
            .create(
                NewAttachment {
                    name: file.name,
                    path: key.clone(),
                    extension,
                    mime_type,
                    content_hash: digest,
                    size_bytes: size,
                },
                owner_id,
            )
            .await?;

        info!(id = attachment.id, path = %key, "attachment created");

        let url = self.storage.url(&key).await?;
        Ok(AttachmentWithUrl::new(attachment, url))
    }

    /// Fetch raw bytes from `url` and ingest them under `dir`.
    ///
    /// Bytes land in a local staging file first; MIME type and extension
    /// are sniffed from content, never from the URL, and the object is
    /// named by a random token. The staging file is removed only after a
    /// successful upload: a failed backend write leaves it behind, and no
    /// metadata record is created.
    #[instrument(skip(self))]
    pub async fn upload_from_url(
        &self,
        dir: &str,
        url: &str,
        owner_id: Id,
    ) -> AttachmentResult<AttachmentWithUrl> {
        let data = self.fetcher.fetch(url).await?;

        let token = hash::random_token(self.config.token_length);
        let staging = self.config.staging_dir.join(format!("attache-{}", token));
        fs::write(&staging, &data).await?;
        debug!(staging = ?staging, size = data.len(), "staged remote payload");

        let mime_type = sniff::sniff_mime(&data);
        let extension = sniff::extension_for_mime(mime_type).unwrap_or("");
        let filename = if extension.is_empty() {
            token.clone()
        } else {
            format!("{}.{}", token, extension)
        };
        let key = join_key(dir, &filename);

        let payload = Bytes::from(fs::read(&staging).await?);
        self.storage.put(&key, payload).await?;

        // Cleanup only follows a successful upload
        if let Err(e) = fs::remove_file(&staging).await {
            warn!(staging = ?staging, error = %e, "failed to remove staging file");
        }

        let attachment = self
            .repo
            .create(
                NewAttachment {
                    name: filename,
                    path: key.clone(),
                    extension: extension.to_string(),
                    mime_type: mime_type.to_string(),
                    content_hash: hash::digest(&data),
                    size_bytes: data.len() as i64,
                },
                owner_id,
            )
            .await?;

        info!(id = attachment.id, path = %key, source = url, "remote attachment ingested");

        let resolved = self.storage.url(&key).await?;
        Ok(AttachmentWithUrl::new(attachment, resolved))
    }

    /// Materialize a cropped derivative of an attachment as a new record.
    ///
    /// The crop result is re-ingested through the full remote-fetch path,
    /// with the source attachment's parent directory as destination, so
    /// derivatives are siblings of their source.
    #[instrument(skip(self, attachment), fields(source = %attachment.path))]
    pub async fn make_crop_derivative(
        &self,
        attachment: &Attachment,
        width: u32,
        height: u32,
        origin_x: u32,
        origin_y: u32,
        owner_id: Id,
    ) -> AttachmentResult<AttachmentWithUrl> {
        if !attachment.is_image() {
            return Err(AttachmentError::NotAnImage(attachment.mime_type.clone()));
        }

        let derived_url = self
            .transformer
            .crop(&attachment.path, width, height, origin_x, origin_y)
            .await?;

        self.upload_from_url(attachment.parent_dir(), &derived_url, owner_id)
            .await
    }

    /// Resolve a thumbnail URL for an attachment. On-demand rendering,
    /// cached in storage; no metadata record is created.
    pub async fn thumbnail_url(
        &self,
        attachment: &Attachment,
        width: u32,
        height: u32,
    ) -> AttachmentResult<String> {
        if !attachment.is_image() {
            return Err(AttachmentError::NotAnImage(attachment.mime_type.clone()));
        }

        Ok(self
            .transformer
            .thumbnail(&attachment.path, width, height)
            .await?)
    }

    /// Delete an attachment: metadata record first, then the backing
    /// object (existence-checked).
    ///
    /// The two phases can fail independently. A crash after the record is
    /// removed leaves an orphaned backing object with no metadata; readers
    /// never see a record whose bytes are gone.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Id) -> AttachmentResult<()> {
        let attachment = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or(AttachmentError::NotFound(id))?;

        self.repo.delete(id).await?;

        if self.storage.exists(&attachment.path).await? {
            self.storage.delete(&attachment.path).await?;
        }

        info!(id = id, path = %attachment.path, "attachment deleted");
        Ok(())
    }

    /// Look up a record by id
    pub async fn find(&self, id: Id) -> AttachmentResult<Option<Attachment>> {
        Ok(self.repo.find_by_id(id).await?)
    }

    /// Look up a record by content hash (advisory dedupe)
    pub async fn find_by_hash(&self, hash: &str) -> AttachmentResult<Option<Attachment>> {
        Ok(self.repo.find_by_hash(hash).await?)
    }

    /// Resolve an attachment's public URL
    pub async fn url(&self, attachment: &Attachment) -> AttachmentResult<String> {
        Ok(self.storage.url(&attachment.path).await?)
    }

    /// Resolve an attachment's filesystem path (opaque for remote backends)
    pub fn absolute_path(&self, attachment: &Attachment) -> AttachmentResult<String> {
        Ok(self.storage.absolute_path(&attachment.path)?)
    }

    /// Read an attachment's bytes from the backing store
    pub async fn open(&self, attachment: &Attachment) -> AttachmentResult<Bytes> {
        Ok(self.storage.get(&attachment.path).await?)
    }
}
