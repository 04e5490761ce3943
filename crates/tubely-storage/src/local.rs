use crate::keys::{random_object_name, validate_key};
use crate::traits::{Storage, StorageError, StorageResult, UploadReader};
use crate::StorageBackend;
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tubely_core::models::AccessUrl;

/// Local filesystem storage implementation
///
/// Objects live at `{base_path}/{bucket}/{key}` and are served from
/// `{base_url}/{bucket}/{key}`. URLs are not signed; `presign` returns the plain URL
/// with the requested expiry attached.
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
    bucket: String,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for file storage (e.g., "/var/lib/tubely/assets")
    /// * `base_url` - Base URL for serving files (e.g., "http://localhost:8091/assets")
    /// * `bucket` - Directory under `base_path` this client writes to
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: String,
        bucket: String,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();
        validate_key(&bucket).map_err(|_| {
            StorageError::ConfigError(format!("Invalid local bucket name: {}", bucket))
        })?;

        fs::create_dir_all(base_path.join(&bucket))
            .await
            .map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create storage directory {}: {}",
                    base_path.display(),
                    e
                ))
            })?;

        Ok(LocalStorage {
            base_path,
            base_url,
            bucket,
        })
    }

    /// Convert bucket and key to a filesystem path with security validation
    fn object_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        if bucket != self.bucket {
            return Err(StorageError::UnknownBucket(bucket.to_string()));
        }
        validate_key(key)?;
        Ok(self.base_path.join(bucket).join(key))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for LocalStorage {
    fn default_bucket(&self) -> &str {
        &self.bucket
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        _content_type: &str,
        mut reader: UploadReader,
    ) -> StorageResult<u64> {
        let path = self.object_path(bucket, key)?;
        self.ensure_parent_dir(&path).await?;
        let start = std::time::Instant::now();

        // Write beside the target and rename so readers never see a partial object.
        let partial = path.with_extension(format!("partial-{}", &random_object_name()[..8]));

        let write = async {
            let mut file = fs::File::create(&partial).await?;
            let size = tokio::io::copy(&mut reader, &mut file).await?;
            file.flush().await?;
            file.sync_all().await?;
            fs::rename(&partial, &path).await?;
            Ok::<u64, std::io::Error>(size)
        };

        match write.await {
            Ok(size) => {
                tracing::info!(
                    path = %path.display(),
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Local storage upload successful"
                );
                Ok(size)
            }
            Err(e) => {
                let _ = fs::remove_file(&partial).await;
                tracing::error!(error = %e, key = %key, "Local storage upload failed");
                Err(StorageError::UploadFailed(format!(
                    "Failed to write file {}: {}",
                    path.display(),
                    e
                )))
            }
        }
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.object_path(bucket, key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::DownloadFailed(format!(
                "Failed to read file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let path = self.object_path(bucket, key)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), key = %key, "Local storage delete successful");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn presign(&self, bucket: &str, key: &str, ttl: Duration) -> StorageResult<AccessUrl> {
        self.object_path(bucket, key)?;
        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl)
                .map_err(|e| StorageError::PresignFailed(e.to_string()))?;
        Ok(AccessUrl::expiring(self.public_url(bucket, key), expires_at))
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("{}/{}/{}", self.base_url.trim_end_matches('/'), bucket, key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
