//! # attache-service
//!
//! Attachment records and upload orchestration for the attache storage
//! service.
//!
//! ## Features
//!
//! - `Attachment` entity with validate-then-persist semantics
//! - Metadata repository keyed by id and content hash (advisory dedupe)
//! - Upload from stream and from remote URL (staged, content-sniffed)
//! - Crop derivatives re-ingested as sibling records
//! - Two-phase delete: metadata record first, backing object second
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use attache_service::{AttachmentConfig, AttachmentService, MemoryRepository, UploadedFile};
//! use attache_storage::LocalStorage;
//!
//! let repo = Arc::new(MemoryRepository::new());
//! let storage = Arc::new(LocalStorage::new("/var/attachments", "https://cdn.example.com"));
//! let service =
//!     AttachmentService::with_http_fetcher(repo, storage, AttachmentConfig::default())?;
//!
//! let file = UploadedFile::new("avatar.png", bytes);
//! let attachment = service.upload("avatars", file, user_id).await?;
//! ```

pub mod fetch;
pub mod model;
pub mod repository;
pub mod service;

pub use fetch::{FetchError, HttpFetcher, RemoteFetcher};
pub use model::{Attachment, AttachmentWithUrl, NewAttachment, UploadedFile};
pub use repository::{
    AttachmentRepository, MemoryRepository, RepositoryError, RepositoryResult,
};
pub use service::{
    AllowedFileTypes, AttachmentConfig, AttachmentError, AttachmentResult, AttachmentService,
};
