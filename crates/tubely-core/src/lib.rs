//! Tubely Core Library
//!
//! This crate provides the domain models, error types and configuration that are
//! shared across all Tubely components: the media record, object references,
//! stream geometry and orientation, and the access-URL policy.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
