//! Blob storage for record attachments.
//!
//! Blobs live in named buckets and are addressed by an opaque, single-segment
//! path (`<uuid>.<ext>`). Rows reference blobs by path; the store itself
//! knows nothing about rows.

pub mod filesystem;

use std::time::SystemTime;

use thiserror::Error;

use crate::models::Bucket;

pub use filesystem::FilesystemBlobStore;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid blob path: {0}")]
    InvalidPath(String),

    #[error("Blob already exists: {0}")]
    AlreadyExists(String),
}

/// Metadata for one stored blob.
#[derive(Debug, Clone)]
pub struct BlobInfo {
    pub path: String,
    pub size: u64,
    pub modified: SystemTime,
}

/// Storage backend trait
pub trait BlobStore: Send + Sync {
    /// Store content under a fresh path. Never overwrites an existing blob.
    fn upload(&self, bucket: Bucket, path: &str, content: &[u8]) -> Result<(), StorageError>;

    /// Remove a blob. Removing a missing blob succeeds.
    fn remove(&self, bucket: Bucket, path: &str) -> Result<(), StorageError>;

    fn exists(&self, bucket: Bucket, path: &str) -> Result<bool, StorageError>;

    /// All blobs currently in the bucket.
    fn list(&self, bucket: Bucket) -> Result<Vec<BlobInfo>, StorageError>;

    /// Public URL clients use to fetch the blob.
    fn public_url(&self, bucket: Bucket, path: &str) -> String;
}

/// Blob paths are a single segment of `[A-Za-z0-9._-]`, not starting with a dot.
pub fn validate_blob_path(path: &str) -> Result<(), StorageError> {
    let valid = !path.is_empty()
        && path.len() <= 128
        && !path.starts_with('.')
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidPath(path.to_string()))
    }
}
