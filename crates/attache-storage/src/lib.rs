//! # attache-storage
//!
//! Backing store abstraction for the attache storage service.
//!
//! ## Features
//!
//! - `Storage` trait polymorphic over backends; callers never branch on
//!   backend type
//! - Local filesystem, in-memory, and remote HTTP object storage backends
//! - Content hashing (SHA-256) and random token generation
//! - Content-based MIME sniffing for byte payloads of unknown origin

pub mod backend;
pub mod hash;
pub mod http;
pub mod local;
pub mod memory;
pub mod sniff;

pub use backend::{join_key, FileMetadata, Storage, StorageError, StorageResult};
pub use hash::{digest, random_token};
pub use http::{HttpStorage, HttpStorageConfig};
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use sniff::{extension_for_mime, sniff_mime};
