//! Application state shared by all handlers.

use std::sync::Arc;
use tubely_db::VideoRepository;
use tubely_processing::{VideoIngestService, VideoUrlResolver};

#[derive(Clone)]
pub struct AppState {
    pub videos: Arc<dyn VideoRepository>,
    pub ingest: VideoIngestService,
}

impl AppState {
    pub fn new(videos: Arc<dyn VideoRepository>, ingest: VideoIngestService) -> Self {
        Self { videos, ingest }
    }

    /// Read-time URL policy, shared with the ingestion service.
    pub fn resolver(&self) -> &VideoUrlResolver {
        self.ingest.resolver()
    }
}
