//! Test helpers: build AppState and router for integration tests.
//!
//! The router is the production one from `setup::routes`; only the collaborators
//! behind it are swapped for the in-memory fakes from `tubely-processing`.

pub mod auth;
pub mod fixtures;

use axum_test::TestServer;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tubely_api::setup::routes;
use tubely_api::state::AppState;
use tubely_core::config::{BaseConfig, StorageConfig, VideoConfig};
use tubely_core::constants::API_PREFIX;
use tubely_core::models::{AccessMode, StreamGeometry};
use tubely_core::{Config, StorageBackend};
use tubely_processing::test_helpers::{
    FakeProber, FakeRemuxer, InMemoryObjectStore, InMemoryVideoRepository, SpyStaging,
};
use tubely_processing::{VideoIngestService, VideoUrlResolver};

/// Upload cap used by the test app.
pub const TEST_MAX_VIDEO_BYTES: u64 = 64 * 1024;

/// API path prefix for tests (e.g. `/api`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", API_PREFIX, path)
}

/// Test application: server plus handles on every fake behind it.
pub struct TestApp {
    pub server: TestServer,
    pub videos: Arc<InMemoryVideoRepository>,
    pub store: Arc<InMemoryObjectStore>,
    pub staging: Arc<SpyStaging>,
    pub prober: Arc<FakeProber>,
    pub remuxer: Arc<FakeRemuxer>,
    pub staging_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Number of files left in the staging directory.
    pub fn staged_files(&self) -> usize {
        std::fs::read_dir(self.staging_dir.path())
            .expect("read staging dir")
            .count()
    }
}

pub fn test_config(staging_dir: PathBuf) -> Config {
    Config {
        base: BaseConfig {
            server_port: 0,
            environment: "test".to_string(),
            database_url: "postgres://unused".to_string(),
            db_max_connections: 1,
            db_timeout_seconds: 1,
            jwt_secret: auth::TEST_JWT_SECRET.to_string(),
            http_concurrency_limit: 64,
        },
        storage: StorageConfig {
            backend: StorageBackend::Local,
            s3_bucket: Some(InMemoryObjectStore::BUCKET.to_string()),
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: None,
            local_storage_base_url: None,
            access_mode: AccessMode::Presigned {
                ttl: Duration::from_secs(3600),
            },
        },
        video: VideoConfig {
            max_video_size_bytes: TEST_MAX_VIDEO_BYTES,
            staging_dir,
            ffprobe_path: "ffprobe".to_string(),
            ffmpeg_path: "ffmpeg".to_string(),
            probe_timeout: Duration::from_secs(5),
            remux_timeout: Duration::from_secs(5),
        },
    }
}

/// Setup a test app whose prober reports a 1920x1080 stream.
pub async fn setup_test_app() -> TestApp {
    setup_test_app_with_geometry(StreamGeometry::new(1920, 1080).expect("valid geometry")).await
}

pub async fn setup_test_app_with_geometry(geometry: StreamGeometry) -> TestApp {
    let staging_dir = tempfile::tempdir().expect("Failed to create staging directory");
    let config = test_config(staging_dir.path().to_path_buf());

    let videos = Arc::new(InMemoryVideoRepository::new());
    let store = Arc::new(InMemoryObjectStore::new());
    let staging = Arc::new(SpyStaging::new(
        staging_dir.path(),
        config.max_video_size_bytes(),
    ));
    let prober = Arc::new(FakeProber::returning(geometry));
    let remuxer = Arc::new(FakeRemuxer::copying());

    let resolver = VideoUrlResolver::new(store.clone(), config.access_mode().clone());
    let ingest = VideoIngestService::new(
        videos.clone(),
        store.clone(),
        staging.clone(),
        prober.clone(),
        remuxer.clone(),
        resolver,
    );
    let state = Arc::new(AppState::new(videos.clone(), ingest));

    let app = routes::setup_routes(&config, state).expect("Failed to build router");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        videos,
        store,
        staging,
        prober,
        remuxer,
        staging_dir,
    }
}
