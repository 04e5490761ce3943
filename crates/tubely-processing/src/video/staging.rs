//! Local staging of inbound streams.
//!
//! A `StagedFile` owns exactly one file on disk. The file is removed by `release` or,
//! failing that, when the guard is dropped, so early returns, panics and cancelled
//! futures all clean up.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tempfile::TempPath;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

const STAGED_PREFIX: &str = "tubely-";

/// An inbound byte stream. May borrow from the request it arrived on.
pub type InboundStream<'a> = Pin<Box<dyn AsyncRead + Send + Unpin + 'a>>;

#[derive(Debug, thiserror::Error)]
pub enum StagingError {
    #[error("Upload exceeds the {limit} byte limit")]
    TooLarge { limit: u64 },

    #[error("Staging IO error: {0}")]
    Io(#[from] io::Error),
}

/// A temporary file exclusively owned by one ingestion call.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    temp: Option<TempPath>,
    size: u64,
}

impl StagedFile {
    fn new(temp: TempPath, size: u64) -> Self {
        Self {
            path: temp.to_path_buf(),
            temp: Some(temp),
            size,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of bytes written at staging time. Zero for reserved output files.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_released(&self) -> bool {
        self.temp.is_none()
    }

    /// Open the file for reading from its first byte.
    pub async fn open(&self) -> io::Result<tokio::fs::File> {
        tokio::fs::File::open(&self.path).await
    }

    /// Remove the file. Safe to call more than once; a file that is already gone
    /// counts as released.
    pub fn release(&mut self) -> io::Result<()> {
        match self.temp.take() {
            Some(temp) => match temp.close() {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(e),
            },
            None => Ok(()),
        }
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            tracing::warn!(
                error = %e,
                path = %self.path.display(),
                "Failed to remove staged file"
            );
        }
    }
}

/// Creates staged files.
#[async_trait]
pub trait Staging: Send + Sync {
    /// Copy the whole stream into a new staged file.
    async fn stage<'r>(&self, reader: InboundStream<'r>) -> Result<StagedFile, StagingError>;

    /// Reserve an empty staged file for a tool to write into.
    async fn reserve(&self, suffix: &str) -> Result<StagedFile, StagingError>;
}

/// Staging area in a local directory with a hard cap on staged bytes.
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
    max_bytes: u64,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    fn create(&self, suffix: &str) -> io::Result<tempfile::NamedTempFile> {
        tempfile::Builder::new()
            .prefix(STAGED_PREFIX)
            .suffix(suffix)
            .tempfile_in(&self.dir)
    }
}

#[async_trait]
impl Staging for StagingArea {
    async fn stage<'r>(&self, reader: InboundStream<'r>) -> Result<StagedFile, StagingError> {
        let start = std::time::Instant::now();
        let (file, temp) = self.create(".upload")?.into_parts();
        // The guard owns the path from here on.
        let mut staged = StagedFile::new(temp, 0);

        let mut file = tokio::fs::File::from_std(file);
        let mut limited = reader.take(self.max_bytes + 1);
        let written = tokio::io::copy(&mut limited, &mut file).await?;
        if written > self.max_bytes {
            return Err(StagingError::TooLarge {
                limit: self.max_bytes,
            });
        }
        file.flush().await?;
        drop(file);

        staged.size = written;
        tracing::debug!(
            path = %staged.path().display(),
            size_bytes = written,
            duration_ms = start.elapsed().as_millis(),
            "Upload staged"
        );
        Ok(staged)
    }

    async fn reserve(&self, suffix: &str) -> Result<StagedFile, StagingError> {
        let temp = self.create(suffix)?.into_temp_path();
        Ok(StagedFile::new(temp, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use tokio::io::AsyncReadExt;

    fn reader(data: &[u8]) -> InboundStream<'static> {
        Box::pin(std::io::Cursor::new(data.to_vec()))
    }

    fn entries(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[tokio::test]
    async fn test_stage_copies_full_stream_and_reads_from_start() {
        let dir = tempdir().unwrap();
        let area = StagingArea::new(dir.path(), 1024);

        let staged = area.stage(reader(b"ftyp fake video")).await.unwrap();
        assert_eq!(staged.size(), 15);

        let mut content = Vec::new();
        staged
            .open()
            .await
            .unwrap()
            .read_to_end(&mut content)
            .await
            .unwrap();
        assert_eq!(content, b"ftyp fake video");
    }

    #[tokio::test]
    async fn test_drop_removes_file() {
        let dir = tempdir().unwrap();
        let area = StagingArea::new(dir.path(), 1024);

        let staged = area.stage(reader(b"data")).await.unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());
        drop(staged);
        assert!(!path.exists());
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let dir = tempdir().unwrap();
        let area = StagingArea::new(dir.path(), 1024);

        let mut staged = area.stage(reader(b"data")).await.unwrap();
        staged.release().unwrap();
        assert!(staged.is_released());
        staged.release().unwrap();
        assert!(!staged.path().exists());
    }

    #[tokio::test]
    async fn test_release_after_external_removal_is_ok() {
        let dir = tempdir().unwrap();
        let area = StagingArea::new(dir.path(), 1024);

        let mut staged = area.stage(reader(b"data")).await.unwrap();
        std::fs::remove_file(staged.path()).unwrap();
        assert!(staged.release().is_ok());
    }

    #[tokio::test]
    async fn test_stage_over_limit_fails_and_leaves_nothing() {
        let dir = tempdir().unwrap();
        let area = StagingArea::new(dir.path(), 8);

        let result = area.stage(reader(b"123456789")).await;
        assert!(matches!(result, Err(StagingError::TooLarge { limit: 8 })));
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_stage_exactly_at_limit_succeeds() {
        let dir = tempdir().unwrap();
        let area = StagingArea::new(dir.path(), 8);

        let staged = area.stage(reader(b"12345678")).await.unwrap();
        assert_eq!(staged.size(), 8);
    }

    #[tokio::test]
    async fn test_reserve_creates_distinct_empty_file() {
        let dir = tempdir().unwrap();
        let area = StagingArea::new(dir.path(), 8);

        let first = area.reserve(".mp4").await.unwrap();
        let second = area.reserve(".mp4").await.unwrap();
        assert_ne!(first.path(), second.path());
        assert_eq!(std::fs::metadata(first.path()).unwrap().len(), 0);
        assert!(first.path().to_string_lossy().ends_with(".mp4"));

        drop(first);
        drop(second);
        assert_eq!(entries(dir.path()), 0);
    }

    /// Yields `head`, then fails as a dropped client connection would.
    struct ResetAfter {
        head: Option<Vec<u8>>,
    }

    impl AsyncRead for ResetAfter {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            match self.head.take() {
                Some(head) => {
                    buf.put_slice(&head);
                    std::task::Poll::Ready(Ok(()))
                }
                None => std::task::Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                ))),
            }
        }
    }

    #[tokio::test]
    async fn test_stream_failure_mid_copy_is_io_error_and_leaves_nothing() {
        let dir = tempdir().unwrap();
        let area = StagingArea::new(dir.path(), 1024);

        let result = area
            .stage(Box::pin(ResetAfter {
                head: Some(b"partial".to_vec()),
            }))
            .await;

        match result {
            Err(StagingError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
            other => panic!("expected Io error, got {other:?}"),
        }
        assert_eq!(entries(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_stage_into_missing_directory_is_io_error() {
        let dir = tempdir().unwrap();
        let area = StagingArea::new(dir.path().join("missing"), 8);
        let result = area.stage(reader(b"data")).await;
        assert!(matches!(result, Err(StagingError::Io(_))));
    }
}
