//! In-memory collaborators and fake media tools for tests.
//!
//! These let the orchestrator and the HTTP layer run without ffmpeg, a database or
//! an object store. Each fake counts its calls so tests can assert which steps ran.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tubely_core::models::{AccessUrl, ObjectReference, StreamGeometry, Video};
use tubely_core::{AppError, StorageBackend};
use tubely_db::{ReferenceUpdate, VideoRepository};
use tubely_storage::{validate_key, Storage, StorageError, StorageResult, UploadReader};
use uuid::Uuid;

use crate::video::{
    InboundStream, MediaProber, ProbeError, RemuxError, Remuxer, StagedFile, Staging,
    StagingArea, StagingError, ToolError,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone)]
struct StoredObject {
    content_type: String,
    data: Vec<u8>,
}

/// Object store held in memory. Serves a single bucket, `InMemoryObjectStore::BUCKET`.
///
/// URLs have the form `memory://{bucket}/{key}`, with an `?expires=` suffix when
/// presigned; `fetch_url` dereferences them.
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: Mutex<HashMap<(String, String), StoredObject>>,
    fail_puts: AtomicBool,
    put_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    presign_calls: AtomicUsize,
}

impl InMemoryObjectStore {
    pub const BUCKET: &'static str = "tubely-test";

    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `put` fail.
    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn presign_calls(&self) -> usize {
        self.presign_calls.load(Ordering::SeqCst)
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        lock(&self.objects)
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.data.clone())
    }

    pub fn content_type(&self, bucket: &str, key: &str) -> Option<String> {
        lock(&self.objects)
            .get(&(bucket.to_string(), key.to_string()))
            .map(|o| o.content_type.clone())
    }

    pub fn object_count(&self) -> usize {
        lock(&self.objects).len()
    }

    /// Bytes served at `url`, if it is one of this store's URLs.
    pub fn fetch_url(&self, url: &str) -> Option<Vec<u8>> {
        let rest = url.strip_prefix("memory://")?;
        let rest = rest.split('?').next()?;
        let (bucket, key) = rest.split_once('/')?;
        self.object(bucket, key)
    }

    fn check_target(&self, bucket: &str, key: &str) -> StorageResult<()> {
        if bucket != Self::BUCKET {
            return Err(StorageError::UnknownBucket(bucket.to_string()));
        }
        validate_key(key)
    }
}

#[async_trait]
impl Storage for InMemoryObjectStore {
    fn default_bucket(&self) -> &str {
        Self::BUCKET
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        content_type: &str,
        mut reader: UploadReader,
    ) -> StorageResult<u64> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.check_target(bucket, key)?;
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::UploadFailed(
                "simulated network failure".to_string(),
            ));
        }

        let mut data = Vec::new();
        reader.read_to_end(&mut data).await?;
        let size = data.len() as u64;
        lock(&self.objects).insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                content_type: content_type.to_string(),
                data,
            },
        );
        Ok(size)
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        self.check_target(bucket, key)?;
        self.object(bucket, key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check_target(bucket, key)?;
        lock(&self.objects).remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn presign(&self, bucket: &str, key: &str, ttl: Duration) -> StorageResult<AccessUrl> {
        self.presign_calls.fetch_add(1, Ordering::SeqCst);
        self.check_target(bucket, key)?;
        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl)
                .map_err(|e| StorageError::PresignFailed(e.to_string()))?;
        Ok(AccessUrl::expiring(
            format!(
                "{}?expires={}",
                self.public_url(bucket, key),
                expires_at.timestamp()
            ),
            expires_at,
        ))
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("memory://{}/{}", bucket, key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

/// Metadata store held in memory.
#[derive(Default)]
pub struct InMemoryVideoRepository {
    videos: Mutex<HashMap<Uuid, Video>>,
    fail_updates: AtomicBool,
}

impl InMemoryVideoRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, video: Video) {
        lock(&self.videos).insert(video.id, video);
    }

    pub fn get(&self, id: Uuid) -> Option<Video> {
        lock(&self.videos).get(&id).cloned()
    }

    /// Modify the stored record in place, as a concurrent editor would.
    pub fn edit(&self, id: Uuid, edit: impl FnOnce(&mut Video)) {
        if let Some(video) = lock(&self.videos).get_mut(&id) {
            edit(video);
        }
    }

    /// Make every subsequent `set_video_reference` fail with a database-style error.
    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl VideoRepository for InMemoryVideoRepository {
    async fn create_video(&self, video: &Video) -> Result<Video, AppError> {
        self.insert(video.clone());
        Ok(video.clone())
    }

    async fn get_video(&self, id: Uuid) -> Result<Option<Video>, AppError> {
        Ok(self.get(id))
    }

    async fn set_video_reference(
        &self,
        id: Uuid,
        owner_id: Uuid,
        reference: &ObjectReference,
    ) -> Result<ReferenceUpdate, AppError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(AppError::Internal("simulated connection reset".to_string()));
        }
        let mut videos = lock(&self.videos);
        let video = videos
            .get_mut(&id)
            .filter(|v| v.is_owned_by(owner_id))
            .ok_or_else(|| {
                AppError::NotFound(format!("Video {} not found for owner {}", id, owner_id))
            })?;
        let previous = video.video.replace(reference.clone());
        video.updated_at = Utc::now();
        Ok(ReferenceUpdate {
            video: video.clone(),
            previous,
        })
    }
}

type ProbeErrorFactory = Box<dyn Fn() -> ProbeError + Send + Sync>;

enum ProbeBehavior {
    Return(StreamGeometry),
    Fail(ProbeErrorFactory),
    Hang,
}

/// Prober with a scripted outcome.
pub struct FakeProber {
    behavior: ProbeBehavior,
    calls: AtomicUsize,
}

impl FakeProber {
    pub fn returning(geometry: StreamGeometry) -> Self {
        Self::with(ProbeBehavior::Return(geometry))
    }

    pub fn failing<F>(error: F) -> Self
    where
        F: Fn() -> ProbeError + Send + Sync + 'static,
    {
        Self::with(ProbeBehavior::Fail(Box::new(error)))
    }

    /// Never completes, like a stuck ffprobe.
    pub fn hanging() -> Self {
        Self::with(ProbeBehavior::Hang)
    }

    fn with(behavior: ProbeBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaProber for FakeProber {
    async fn probe(&self, path: &Path) -> Result<StreamGeometry, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !path.exists() {
            return Err(ProbeError::Malformed(format!(
                "{} does not exist",
                path.display()
            )));
        }
        match &self.behavior {
            ProbeBehavior::Return(geometry) => Ok(*geometry),
            ProbeBehavior::Fail(error) => Err(error()),
            ProbeBehavior::Hang => std::future::pending().await,
        }
    }
}

/// Remuxer that rewrites the input with a marker prefix instead of running ffmpeg.
pub struct FakeRemuxer {
    fail: bool,
    calls: AtomicUsize,
}

impl FakeRemuxer {
    const MARKER: &'static [u8] = b"faststart:";

    pub fn copying() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Writes half an output file, then reports failure.
    pub fn failing_after_partial_write() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// What `copying` produces for `input`.
    pub fn remuxed_bytes(input: &[u8]) -> Vec<u8> {
        let mut out = Self::MARKER.to_vec();
        out.extend_from_slice(input);
        out
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Remuxer for FakeRemuxer {
    async fn remux(&self, input: &Path, output: &Path) -> Result<(), RemuxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let io_failure = |e: std::io::Error| {
            RemuxError::Tool(ToolError::Spawn {
                tool: "fake-ffmpeg".to_string(),
                source: e,
            })
        };

        let data = tokio::fs::read(input).await.map_err(io_failure)?;
        let remuxed = Self::remuxed_bytes(&data);

        if self.fail {
            tokio::fs::write(output, &remuxed[..remuxed.len() / 2])
                .await
                .map_err(io_failure)?;
            return Err(RemuxError::Tool(ToolError::Failed {
                tool: "fake-ffmpeg".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "Invalid data found when processing input".to_string(),
            }));
        }

        tokio::fs::write(output, remuxed).await.map_err(io_failure)?;
        Ok(())
    }
}

/// Staging area that counts how often it is asked to stage or reserve.
pub struct SpyStaging {
    inner: StagingArea,
    stage_calls: AtomicUsize,
    reserve_calls: AtomicUsize,
}

impl SpyStaging {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            inner: StagingArea::new(dir, max_bytes),
            stage_calls: AtomicUsize::new(0),
            reserve_calls: AtomicUsize::new(0),
        }
    }

    pub fn stage_calls(&self) -> usize {
        self.stage_calls.load(Ordering::SeqCst)
    }

    pub fn reserve_calls(&self) -> usize {
        self.reserve_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Staging for SpyStaging {
    async fn stage<'r>(&self, reader: InboundStream<'r>) -> Result<StagedFile, StagingError> {
        self.stage_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.stage(reader).await
    }

    async fn reserve(&self, suffix: &str) -> Result<StagedFile, StagingError> {
        self.reserve_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.reserve(suffix).await
    }
}
