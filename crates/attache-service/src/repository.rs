//! Metadata Repository
//!
//! Persists attachment records keyed by id and by content hash. The
//! repository stamps ids, owner and timestamps; callers never set them.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use attache_core::{Id, ValidationErrors};
use chrono::Utc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::model::{Attachment, NewAttachment};

/// Repository errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("attachment not found: {0}")]
    NotFound(Id),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("repository backend error: {0}")]
    Backend(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Attachment metadata repository
#[async_trait]
pub trait AttachmentRepository: Send + Sync {
    /// Validate and persist a new record, stamping id, owner and timestamps
    async fn create(&self, new: NewAttachment, owner_id: Id) -> RepositoryResult<Attachment>;

    /// Look up a record by id
    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Attachment>>;

    /// Look up a record by storage key. Paths are unique, so at most one
    /// record matches.
    async fn find_by_path(&self, path: &str) -> RepositoryResult<Option<Attachment>>;

    /// Look up a record by content hash. Dedupe is advisory: multiple
    /// records may share a hash, the first match wins.
    async fn find_by_hash(&self, hash: &str) -> RepositoryResult<Option<Attachment>>;

    /// Delete a record by id; `NotFound` when no record exists
    async fn delete(&self, id: Id) -> RepositoryResult<()>;
}

/// In-memory attachment repository for tests and single-process use
pub struct MemoryRepository {
    records: RwLock<Vec<Attachment>>,
    next_id: AtomicI64,
}

impl Default for MemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

#[async_trait]
impl AttachmentRepository for MemoryRepository {
    async fn create(&self, new: NewAttachment, owner_id: Id) -> RepositoryResult<Attachment> {
        new.validate()?;

        let mut records = self.records.write().await;
        if records.iter().any(|a| a.path == new.path) {
            let mut errors = ValidationErrors::new();
            errors.add("path", "has already been taken");
            return Err(errors.into());
        }

        let now = Utc::now();
        let attachment = Attachment {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            owner_id,
            name: new.name,
            path: new.path,
            extension: new.extension,
            mime_type: new.mime_type,
            content_hash: new.content_hash,
            size_bytes: new.size_bytes,
            created_at: now,
            updated_at: now,
        };
        records.push(attachment.clone());

        Ok(attachment)
    }

    async fn find_by_id(&self, id: Id) -> RepositoryResult<Option<Attachment>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|a| a.id == id).cloned())
    }

    async fn find_by_path(&self, path: &str) -> RepositoryResult<Option<Attachment>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|a| a.path == path).cloned())
    }

    async fn find_by_hash(&self, hash: &str) -> RepositoryResult<Option<Attachment>> {
        let records = self.records.read().await;
        Ok(records.iter().find(|a| a.content_hash == hash).cloned())
    }

    async fn delete(&self, id: Id) -> RepositoryResult<()> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|a| a.id != id);
        if records.len() == before {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }
}
