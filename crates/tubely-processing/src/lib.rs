//! Tubely Processing Library
//!
//! The video ingestion pipeline: staging of inbound streams, geometry probing,
//! orientation classification, fast-start remuxing, upload, and the orchestrator
//! that composes them under the ownership check. Also resolves stored references
//! to access URLs at read time.

pub mod video;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use video::{
    classify, FfmpegRemuxer, FfprobeProber, InboundStream, IngestError, MediaProber, ProbeError,
    RemuxError, Remuxer, StagedFile, Staging, StagingArea, StagingError, ToolError,
    VideoIngestService, VideoUrlResolver,
};
