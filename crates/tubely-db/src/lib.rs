//! Tubely Database Library
//!
//! Metadata store for media records. The ingestion pipeline talks to it through the
//! `VideoRepository` trait; `PgVideoRepository` is the PostgreSQL implementation.

pub mod db;

pub use db::{PgVideoRepository, ReferenceUpdate, VideoRepository};
