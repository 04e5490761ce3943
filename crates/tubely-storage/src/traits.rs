//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncRead;
use tubely_core::models::AccessUrl;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Presign failed: {0}")]
    PresignFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Bucket not served by this client: {0}")]
    UnknownBucket(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Byte source for `Storage::put`.
pub type UploadReader = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// Storage abstraction trait
///
/// All storage backends (S3, local filesystem) implement this trait, so the ingestion
/// pipeline works with any backend. Objects are addressed by `(bucket, key)`; a client
/// serves exactly one bucket, which it reports through `default_bucket`.
///
/// `put` must never leave a partially written object visible: after an error the object
/// is either absent or unchanged.
#[async_trait]
pub trait Storage: Send + Sync {
    /// The bucket this client writes to.
    fn default_bucket(&self) -> &str;

    /// Stream the reader's full content to `bucket/key`. Returns the number of bytes stored.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        reader: UploadReader,
    ) -> StorageResult<u64>;

    /// Download an object's bytes.
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()>;

    /// Mint a time-limited GET URL for an object.
    async fn presign(&self, bucket: &str, key: &str, ttl: Duration) -> StorageResult<AccessUrl>;

    /// The stable, unsigned URL of an object.
    fn public_url(&self, bucket: &str, key: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
