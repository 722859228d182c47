//! Attachment Model
//!
//! The persisted record describing one stored binary object, plus the
//! unsaved parameter set it is created from and the uploaded-file
//! abstraction handed over by the HTTP layer upstream.

use attache_core::{Id, Identifiable, Timestamped, ValidationErrors};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum length of general string fields
const MAX_FIELD_LEN: usize = 255;
/// Maximum length of the content hash field
const MAX_HASH_LEN: usize = 64;

/// An attachment record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    /// Record ID, assigned at creation
    pub id: Id,
    /// Principal that created the record; never mutated afterwards
    pub owner_id: Id,
    /// Original or generated filename
    pub name: String,
    /// Storage key inside the backing store; unique
    pub path: String,
    /// File extension
    pub extension: String,
    /// MIME content type
    pub mime_type: String,
    /// Content-derived digest, used for dedupe lookup
    pub content_hash: String,
    /// Byte length of the stored object
    pub size_bytes: i64,
    /// Created timestamp, system-set
    pub created_at: DateTime<Utc>,
    /// Updated timestamp, system-set
    pub updated_at: DateTime<Utc>,
}

impl Attachment {
    /// Check if this is an image
    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    /// Directory portion of the storage key; empty for top-level objects
    pub fn parent_dir(&self) -> &str {
        self.path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
    }
}

impl Identifiable for Attachment {
    fn id(&self) -> Id {
        self.id
    }
}

impl Timestamped for Attachment {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Unsaved attachment attributes; id, owner and timestamps are stamped by
/// the repository at create time
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub name: String,
    pub path: String,
    pub extension: String,
    pub mime_type: String,
    pub content_hash: String,
    pub size_bytes: i64,
}

impl NewAttachment {
    /// Field-level validation, mirrored into the repository's create path
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.path.is_empty() {
            errors.add("path", "cannot be blank");
        }
        if self.content_hash.is_empty() {
            errors.add("content_hash", "cannot be blank");
        }
        if self.content_hash.len() > MAX_HASH_LEN {
            errors.add(
                "content_hash",
                format!("is too long (maximum is {} characters)", MAX_HASH_LEN),
            );
        }
        for (field, value) in [
            ("name", &self.name),
            ("path", &self.path),
            ("extension", &self.extension),
            ("mime_type", &self.mime_type),
        ] {
            if value.len() > MAX_FIELD_LEN {
                errors.add(
                    field,
                    format!("is too long (maximum is {} characters)", MAX_FIELD_LEN),
                );
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Attachment as serialized for external consumers: the persisted columns
/// plus the computed `url`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentWithUrl {
    #[serde(flatten)]
    pub attachment: Attachment,
    pub url: String,
}

impl AttachmentWithUrl {
    pub fn new(attachment: Attachment, url: String) -> Self {
        Self { attachment, url }
    }
}

/// A file handed over by the upstream request-handling layer
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Client-supplied filename
    pub name: String,
    /// Client-declared content type, if any
    pub content_type: Option<String>,
    /// File bytes
    pub data: Bytes,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, data: Bytes) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            data,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn size(&self) -> i64 {
        self.data.len() as i64
    }

    /// Extension taken from the client-supplied filename
    pub fn extension(&self) -> Option<&str> {
        if !self.name.contains('.') {
            return None;
        }
        self.name
            .rsplit('.')
            .next()
            .filter(|ext| !ext.is_empty() && ext.len() <= 10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_new() -> NewAttachment {
        NewAttachment {
            name: "photo.png".to_string(),
            path: "img/abc.png".to_string(),
            extension: "png".to_string(),
            mime_type: "image/png".to_string(),
            content_hash: "a".repeat(64),
            size_bytes: 10,
        }
    }

    #[test]
    fn test_validate_ok() {
        assert!(valid_new().validate().is_ok());
    }

    #[test]
    fn test_validate_blank_path() {
        let mut new = valid_new();
        new.path = String::new();
        let errors = new.validate().unwrap_err();
        assert!(errors.has_error("path"));
    }

    #[test]
    fn test_validate_blank_hash() {
        let mut new = valid_new();
        new.content_hash = String::new();
        let errors = new.validate().unwrap_err();
        assert!(errors.has_error("content_hash"));
    }

    #[test]
    fn test_validate_hash_too_long() {
        let mut new = valid_new();
        new.content_hash = "a".repeat(65);
        let errors = new.validate().unwrap_err();
        assert!(errors.has_error("content_hash"));
    }

    #[test]
    fn test_validate_name_too_long() {
        let mut new = valid_new();
        new.name = "x".repeat(256);
        let errors = new.validate().unwrap_err();
        assert!(errors.has_error("name"));
    }

    #[test]
    fn test_uploaded_file_extension() {
        let file = UploadedFile::new("report.tar.gz", Bytes::from("x"));
        assert_eq!(file.extension(), Some("gz"));

        let no_ext = UploadedFile::new("noextension", Bytes::from("x"));
        assert_eq!(no_ext.extension(), None);
    }

    #[test]
    fn test_parent_dir() {
        let mut attachment = sample();
        assert_eq!(attachment.parent_dir(), "img");

        attachment.path = "toplevel.png".to_string();
        assert_eq!(attachment.parent_dir(), "");
    }

    #[test]
    fn test_with_url_serialization_flattens() {
        let with_url = AttachmentWithUrl::new(sample(), "http://cdn/img/abc.png".to_string());
        let json = serde_json::to_value(&with_url).unwrap();

        assert_eq!(json["url"], "http://cdn/img/abc.png");
        assert_eq!(json["path"], "img/abc.png");
        assert!(json.get("attachment").is_none());
    }

    fn sample() -> Attachment {
        let now = Utc::now();
        Attachment {
            id: 1,
            owner_id: 7,
            name: "photo.png".to_string(),
            path: "img/abc.png".to_string(),
            extension: "png".to_string(),
            mime_type: "image/png".to_string(),
            content_hash: "a".repeat(64),
            size_bytes: 10,
            created_at: now,
            updated_at: now,
        }
    }
}
