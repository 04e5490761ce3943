//! Database repositories for data access layer
//!
//! Each repository is responsible for a specific domain entity and provides
//! CRUD operations and specialized queries.

pub mod video;

pub use video::{PgVideoRepository, ReferenceUpdate, VideoRepository};
