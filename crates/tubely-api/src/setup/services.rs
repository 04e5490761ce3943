//! Service initialization: repositories and the ingestion pipeline.

use crate::state::AppState;
use anyhow::{Context, Result};
use sqlx::PgPool;
use std::sync::Arc;
use tubely_core::Config;
use tubely_db::{PgVideoRepository, VideoRepository};
use tubely_processing::{
    FfmpegRemuxer, FfprobeProber, StagingArea, VideoIngestService, VideoUrlResolver,
};
use tubely_storage::Storage;

pub async fn initialize_services(
    config: &Config,
    pool: PgPool,
    storage: Arc<dyn Storage>,
) -> Result<Arc<AppState>> {
    let videos: Arc<dyn VideoRepository> = Arc::new(PgVideoRepository::new(pool));

    tokio::fs::create_dir_all(config.staging_dir())
        .await
        .with_context(|| {
            format!(
                "Failed to create staging directory {}",
                config.staging_dir().display()
            )
        })?;

    let staging = StagingArea::new(config.staging_dir(), config.max_video_size_bytes());
    let prober = FfprobeProber::new(config.ffprobe_path(), config.probe_timeout());
    let remuxer = FfmpegRemuxer::new(config.ffmpeg_path(), config.remux_timeout());
    let resolver = VideoUrlResolver::new(storage.clone(), config.access_mode().clone());

    tracing::info!(
        staging_dir = %staging.dir().display(),
        max_video_bytes = staging.max_bytes(),
        access_mode = %resolver.mode(),
        ffprobe_path = %config.ffprobe_path(),
        ffmpeg_path = %config.ffmpeg_path(),
        "Video ingestion pipeline initialized"
    );

    let ingest = VideoIngestService::new(
        videos.clone(),
        storage,
        Arc::new(staging),
        Arc::new(prober),
        Arc::new(remuxer),
        resolver,
    );

    Ok(Arc::new(AppState::new(videos, ingest)))
}
