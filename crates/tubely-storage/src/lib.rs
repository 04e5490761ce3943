//! Tubely Storage Library
//!
//! This crate provides the object store client used by the ingestion pipeline.
//! It includes the `Storage` trait and implementations for S3 and the local filesystem.
//!
//! # Storage key format
//!
//! Video objects are keyed `{orientation}/{name}.mp4`, where `name` is 32 random bytes
//! encoded as URL-safe base64 without padding. Keys must not contain `..` or a leading `/`.
//! Key generation and validation are centralized in the `keys` module so all backends
//! stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use keys::{generate_video_key, validate_key};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult, UploadReader};
pub use tubely_core::StorageBackend;
