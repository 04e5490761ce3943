//! Video ingestion orchestration: validate → authorize → stage → probe → remux →
//! upload → update record.

use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use tubely_core::constants::{ACCEPTED_VIDEO_CONTENT_TYPE, VIDEO_EXTENSION};
use tubely_core::models::{ObjectReference, Orientation, VideoResponse};
use tubely_core::AppError;
use tubely_db::VideoRepository;
use tubely_storage::{generate_video_key, Storage, StorageError};

use super::classifier::classify;
use super::prober::{MediaProber, ProbeError};
use super::remuxer::{RemuxError, Remuxer};
use super::resolver::VideoUrlResolver;
use super::staging::{InboundStream, StagedFile, Staging, StagingError};

/// Failure of one ingestion call. Every variant is terminal.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Video {0} not found")]
    NotFound(Uuid),

    #[error("User {requester_id} does not own video {video_id}")]
    Authorization { video_id: Uuid, requester_id: Uuid },

    #[error("Video exceeds the {limit} byte upload limit")]
    PayloadTooLarge { limit: u64 },

    #[error("Staging failed: {0}")]
    Io(#[source] std::io::Error),

    #[error("Probe failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("Remux failed: {0}")]
    Remux(#[from] RemuxError),

    #[error("Object store failed: {0}")]
    Store(#[from] StorageError),

    #[error("Metadata lookup failed: {0}")]
    Lookup(#[source] AppError),

    #[error("Record update failed after upload of {reference}: {source}")]
    Persistence {
        reference: ObjectReference,
        #[source]
        source: AppError,
    },
}

impl From<StagingError> for IngestError {
    fn from(err: StagingError) -> Self {
        match err {
            StagingError::TooLarge { limit } => IngestError::PayloadTooLarge { limit },
            StagingError::Io(e) => IngestError::Io(e),
        }
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Validation(msg) => AppError::InvalidInput(msg),
            IngestError::NotFound(id) => AppError::NotFound(format!("Video {} not found", id)),
            IngestError::Authorization { .. } => {
                AppError::Forbidden("You do not own this video".to_string())
            }
            IngestError::PayloadTooLarge { limit } => AppError::PayloadTooLarge(format!(
                "Video exceeds the maximum upload size of {} MB",
                limit / (1024 * 1024)
            )),
            IngestError::Io(e) => AppError::Internal(format!("Staging failed: {}", e)),
            IngestError::Probe(e) => AppError::MediaProbe(e.to_string()),
            IngestError::Remux(e) => AppError::MediaConversionError(e.to_string()),
            IngestError::Store(e) => AppError::Storage(e.to_string()),
            IngestError::Lookup(e) => e,
            IngestError::Persistence { reference, source } => AppError::Persistence {
                message: source.to_string(),
                bucket: reference.bucket,
                key: reference.key,
            },
        }
    }
}

/// Check a declared content type against the single accepted container type.
/// MIME parameters are ignored and the comparison is case-insensitive.
pub fn validate_content_type(content_type: &str) -> Result<(), IngestError> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence.is_empty() {
        return Err(IngestError::Validation(
            "Missing content type for video upload".to_string(),
        ));
    }
    if essence != ACCEPTED_VIDEO_CONTENT_TYPE {
        return Err(IngestError::Validation(format!(
            "Unsupported content type '{}': only {} is accepted",
            essence, ACCEPTED_VIDEO_CONTENT_TYPE
        )));
    }
    Ok(())
}

/// Composes the pipeline for one upload. Holds no per-call state, so one instance
/// serves any number of concurrent calls.
#[derive(Clone)]
pub struct VideoIngestService {
    repository: Arc<dyn VideoRepository>,
    storage: Arc<dyn Storage>,
    staging: Arc<dyn Staging>,
    prober: Arc<dyn MediaProber>,
    remuxer: Arc<dyn Remuxer>,
    resolver: VideoUrlResolver,
}

impl VideoIngestService {
    pub fn new(
        repository: Arc<dyn VideoRepository>,
        storage: Arc<dyn Storage>,
        staging: Arc<dyn Staging>,
        prober: Arc<dyn MediaProber>,
        remuxer: Arc<dyn Remuxer>,
        resolver: VideoUrlResolver,
    ) -> Self {
        Self {
            repository,
            storage,
            staging,
            prober,
            remuxer,
            resolver,
        }
    }

    pub fn resolver(&self) -> &VideoUrlResolver {
        &self.resolver
    }

    /// Ingest an uploaded video stream into the record `video_id`.
    ///
    /// Nothing is staged before the content type and ownership checks pass. Staged
    /// files are released on every exit path.
    #[tracing::instrument(skip_all, fields(video_id = %video_id, requester_id = %requester_id, content_type = %content_type))]
    pub async fn ingest_video(
        &self,
        video_id: Uuid,
        requester_id: Uuid,
        content_type: &str,
        reader: InboundStream<'_>,
    ) -> Result<VideoResponse, IngestError> {
        let started = Instant::now();

        validate_content_type(content_type)?;

        let video = self
            .repository
            .get_video(video_id)
            .await
            .map_err(IngestError::Lookup)?
            .ok_or(IngestError::NotFound(video_id))?;

        if !video.is_owned_by(requester_id) {
            tracing::warn!(
                video_id = %video_id,
                requester_id = %requester_id,
                owner_id = %video.user_id,
                "Rejected upload from non-owner"
            );
            return Err(IngestError::Authorization {
                video_id,
                requester_id,
            });
        }

        let step = Instant::now();
        let mut upload = self.staging.stage(reader).await?;
        tracing::info!(
            video_id = %video_id,
            size_bytes = upload.size(),
            duration_ms = step.elapsed().as_millis(),
            "Upload staged"
        );

        let step = Instant::now();
        let geometry = self.prober.probe(upload.path()).await?;
        let orientation = classify(&geometry);
        tracing::info!(
            video_id = %video_id,
            geometry = %geometry,
            orientation = %orientation,
            duration_ms = step.elapsed().as_millis(),
            "Video probed"
        );

        let step = Instant::now();
        let mut processed = self.remux(&upload).await?;
        release(&mut upload);
        tracing::info!(
            video_id = %video_id,
            duration_ms = step.elapsed().as_millis(),
            "Video remuxed for fast start"
        );

        let step = Instant::now();
        let reference = self.upload(&processed, orientation).await?;
        release(&mut processed);
        tracing::info!(
            video_id = %video_id,
            bucket = %reference.bucket,
            key = %reference.key,
            duration_ms = step.elapsed().as_millis(),
            "Video uploaded"
        );

        // Only the reference is written, and only while the requester still owns
        // the record; other fields may have been edited since the lookup.
        let update = match self
            .repository
            .set_video_reference(video_id, requester_id, &reference)
            .await
        {
            Ok(update) => update,
            Err(source) => {
                self.handle_orphan(video_id, &reference).await;
                return Err(IngestError::Persistence { reference, source });
            }
        };

        if let Some(previous) = update.previous.filter(|p| *p != reference) {
            tracing::info!(
                video_id = %video_id,
                bucket = %previous.bucket,
                key = %previous.key,
                "Previous video object replaced"
            );
            self.delete_unreferenced(video_id, &previous).await;
        }
        let video = update.video;

        let response = self.resolver.to_response(video).await?;
        tracing::info!(
            video_id = %video_id,
            duration_ms = started.elapsed().as_millis(),
            "Video ingestion completed"
        );
        Ok(response)
    }

    /// Remux `input` into a freshly reserved staged file.
    async fn remux(&self, input: &StagedFile) -> Result<StagedFile, IngestError> {
        let output = self
            .staging
            .reserve(&format!(".{}", VIDEO_EXTENSION))
            .await?;
        self.remuxer.remux(input.path(), output.path()).await?;
        Ok(output)
    }

    async fn upload(
        &self,
        file: &StagedFile,
        orientation: Orientation,
    ) -> Result<ObjectReference, IngestError> {
        let bucket = self.storage.default_bucket().to_string();
        let key = generate_video_key(orientation);
        let reader = file.open().await.map_err(IngestError::Io)?;

        self.storage
            .put(&bucket, &key, ACCEPTED_VIDEO_CONTENT_TYPE, Box::pin(reader))
            .await?;

        Ok(ObjectReference::new(bucket, key))
    }

    /// The object is stored but no record points at it. Log it for reconciliation,
    /// then try to remove it.
    async fn handle_orphan(&self, video_id: Uuid, reference: &ObjectReference) {
        tracing::error!(
            video_id = %video_id,
            bucket = %reference.bucket,
            key = %reference.key,
            "orphaned object after metadata write failure"
        );
        self.delete_unreferenced(video_id, reference).await;
    }

    /// Best-effort removal of an object no record points at any more.
    async fn delete_unreferenced(&self, video_id: Uuid, reference: &ObjectReference) {
        match self
            .storage
            .delete(&reference.bucket, &reference.key)
            .await
        {
            Ok(()) => tracing::info!(
                video_id = %video_id,
                bucket = %reference.bucket,
                key = %reference.key,
                "Deleted unreferenced object"
            ),
            Err(e) => tracing::error!(
                error = %e,
                video_id = %video_id,
                bucket = %reference.bucket,
                key = %reference.key,
                "Failed to delete unreferenced object; manual cleanup required"
            ),
        }
    }
}

fn release(file: &mut StagedFile) {
    if let Err(e) = file.release() {
        tracing::warn!(error = %e, path = %file.path().display(), "Failed to remove staged file");
    }
}
