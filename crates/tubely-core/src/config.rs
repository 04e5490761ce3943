//! Configuration module
//!
//! This module provides configuration structures for the API and the ingestion
//! pipeline: server, database, storage, access-URL policy and external tools.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::models::AccessMode;
use crate::storage_types::StorageBackend;

// Common constants
const SERVER_PORT: u16 = 8091;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_VIDEO_SIZE_MB: u64 = 1024;
const PRESIGN_TTL_SECS: u64 = 3600;
const PROBE_TIMEOUT_SECS: u64 = 30;
const REMUX_TIMEOUT_SECS: u64 = 300;
const HTTP_CONCURRENCY_LIMIT: usize = 10_000;
const BYTES_PER_MB: u64 = 1024 * 1024;

/// Base configuration: server, database and authentication.
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub environment: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub jwt_secret: String,
    /// Maximum number of in-flight HTTP requests.
    pub http_concurrency_limit: usize,
}

/// Storage and access-URL configuration.
#[derive(Clone, Debug)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO etc.)
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub access_mode: AccessMode,
}

/// Video ingestion configuration.
#[derive(Clone, Debug)]
pub struct VideoConfig {
    pub max_video_size_bytes: u64,
    pub staging_dir: PathBuf,
    pub ffprobe_path: String,
    pub ffmpeg_path: String,
    pub probe_timeout: Duration,
    pub remux_timeout: Duration,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub base: BaseConfig,
    pub storage: StorageConfig,
    pub video: VideoConfig,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn megabytes_to_bytes(name: &str, mb: u64) -> Result<u64, anyhow::Error> {
    mb.checked_mul(BYTES_PER_MB)
        .ok_or_else(|| anyhow::anyhow!("{} is too large: {} MB", name, mb))
}

/// Parse `VIDEO_ACCESS_MODE` together with the settings each mode needs.
fn parse_access_mode(
    mode: &str,
    ttl_secs: u64,
    cdn_base_url: Option<String>,
) -> Result<AccessMode, anyhow::Error> {
    match mode.trim().to_lowercase().as_str() {
        "presigned" => Ok(AccessMode::Presigned {
            ttl: Duration::from_secs(ttl_secs),
        }),
        "direct" => Ok(AccessMode::Direct),
        "cdn" => {
            let base_url = cdn_base_url
                .filter(|u| !u.trim().is_empty())
                .ok_or_else(|| {
                    anyhow::anyhow!("CDN_BASE_URL must be set when VIDEO_ACCESS_MODE=cdn")
                })?;
            Ok(AccessMode::Cdn {
                base_url: base_url.trim_end_matches('/').to_string(),
            })
        }
        other => Err(anyhow::anyhow!(
            "Invalid VIDEO_ACCESS_MODE '{}': expected presigned, direct or cdn",
            other
        )),
    }
}

/// Reject executable paths that could be interpreted by a shell.
fn validate_executable_path(name: &str, path: &str) -> Result<(), anyhow::Error> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.is_empty() || path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(anyhow::anyhow!("{} contains unsafe characters", name));
    }
    Ok(())
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: env_or("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            jwt_secret: env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET must be set for authentication"))?,
            http_concurrency_limit: env_or("HTTP_CONCURRENCY_LIMIT", HTTP_CONCURRENCY_LIMIT),
        };

        let backend = match env::var("STORAGE_BACKEND") {
            Ok(s) => s.parse::<StorageBackend>()?,
            Err(_) => StorageBackend::S3,
        };

        let access_mode = parse_access_mode(
            &env::var("VIDEO_ACCESS_MODE").unwrap_or_else(|_| "presigned".to_string()),
            env_or("PRESIGN_TTL_SECS", PRESIGN_TTL_SECS),
            env::var("CDN_BASE_URL").ok(),
        )?;

        let storage = StorageConfig {
            backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION")
                .or_else(|_| env::var("AWS_REGION"))
                .ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            access_mode,
        };

        let video = VideoConfig {
            max_video_size_bytes: megabytes_to_bytes(
                "MAX_VIDEO_SIZE_MB",
                env_or("MAX_VIDEO_SIZE_MB", MAX_VIDEO_SIZE_MB),
            )?,
            staging_dir: env::var("STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir()),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            probe_timeout: Duration::from_secs(env_or("PROBE_TIMEOUT_SECS", PROBE_TIMEOUT_SECS)),
            remux_timeout: Duration::from_secs(env_or("REMUX_TIMEOUT_SECS", REMUX_TIMEOUT_SECS)),
        };

        let config = Config {
            base,
            storage,
            video,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.base.jwt_secret.trim().is_empty() {
            return Err(anyhow::anyhow!("JWT_SECRET must not be empty"));
        }
        if self.base.http_concurrency_limit == 0 {
            return Err(anyhow::anyhow!(
                "HTTP_CONCURRENCY_LIMIT must be greater than zero"
            ));
        }

        match self.storage.backend {
            StorageBackend::S3 => {
                if self.storage.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.storage.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.storage.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.storage.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        if let AccessMode::Presigned { ttl } = &self.storage.access_mode {
            if ttl.is_zero() {
                return Err(anyhow::anyhow!("PRESIGN_TTL_SECS must be greater than zero"));
            }
        }

        if self.video.max_video_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_VIDEO_SIZE_MB must be greater than zero"));
        }
        if self.video.probe_timeout.is_zero() || self.video.remux_timeout.is_zero() {
            return Err(anyhow::anyhow!(
                "PROBE_TIMEOUT_SECS and REMUX_TIMEOUT_SECS must be greater than zero"
            ));
        }
        validate_executable_path("FFPROBE_PATH", &self.video.ffprobe_path)?;
        validate_executable_path("FFMPEG_PATH", &self.video.ffmpeg_path)?;

        Ok(())
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.base.server_port
    }

    pub fn environment(&self) -> &str {
        &self.base.environment
    }

    pub fn database_url(&self) -> &str {
        &self.base.database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.base.db_timeout_seconds
    }

    pub fn jwt_secret(&self) -> &str {
        &self.base.jwt_secret
    }

    pub fn http_concurrency_limit(&self) -> usize {
        self.base.http_concurrency_limit
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.storage.backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.storage.s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.storage.s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.storage.s3_endpoint.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.storage.local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.storage.local_storage_base_url.as_deref()
    }

    pub fn access_mode(&self) -> &AccessMode {
        &self.storage.access_mode
    }

    pub fn max_video_size_bytes(&self) -> u64 {
        self.video.max_video_size_bytes
    }

    pub fn staging_dir(&self) -> &std::path::Path {
        &self.video.staging_dir
    }

    pub fn ffprobe_path(&self) -> &str {
        &self.video.ffprobe_path
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.video.ffmpeg_path
    }

    pub fn probe_timeout(&self) -> Duration {
        self.video.probe_timeout
    }

    pub fn remux_timeout(&self) -> Duration {
        self.video.remux_timeout
    }
}
