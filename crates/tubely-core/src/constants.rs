//! Fixed values of the video ingestion pipeline.

/// The only container type accepted for video uploads.
pub const ACCEPTED_VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Extension appended to every stored video object key.
pub const VIDEO_EXTENSION: &str = "mp4";

/// Number of random bytes in a generated object name (before encoding).
pub const STORAGE_KEY_RANDOM_BYTES: usize = 32;

/// Multipart form field carrying the video stream.
pub const VIDEO_FORM_FIELD: &str = "video";

/// API route prefix.
pub const API_PREFIX: &str = "/api";

/// Bucket directory used by the local storage backend when `S3_BUCKET` is unset.
pub const DEFAULT_LOCAL_BUCKET: &str = "tubely";
