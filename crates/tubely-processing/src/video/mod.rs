//! Video ingestion pipeline
//!
//! Data flow: inbound stream → staging → probe → classify → remux → upload →
//! metadata update. Every staged file is owned by a guard that removes it when the
//! call ends, whichever way it ends.

pub mod classifier;
pub mod ingest;
pub mod process;
pub mod prober;
pub mod remuxer;
pub mod resolver;
pub mod staging;

pub use classifier::classify;
pub use ingest::{IngestError, VideoIngestService};
pub use process::ToolError;
pub use prober::{FfprobeProber, MediaProber, ProbeError};
pub use remuxer::{FfmpegRemuxer, RemuxError, Remuxer};
pub use resolver::VideoUrlResolver;
pub use staging::{InboundStream, StagedFile, Staging, StagingArea, StagingError};
