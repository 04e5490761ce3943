//! Data models for the application
//!
//! Each sub-module represents a specific feature area of the video pipeline.

mod access;
mod geometry;
mod video;

// Re-export all models for convenient imports
pub use access::*;
pub use geometry::*;
pub use video::*;
