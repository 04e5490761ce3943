//! Fast-start remuxing via ffmpeg.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

use super::process::{run_tool, ToolError};

#[derive(Debug, thiserror::Error)]
pub enum RemuxError {
    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Rewrites a container so its metadata precedes the media data. Streams are
/// copied without re-encoding.
#[async_trait]
pub trait Remuxer: Send + Sync {
    /// Write the remuxed form of `input` to `output`, replacing whatever is there.
    async fn remux(&self, input: &Path, output: &Path) -> Result<(), RemuxError>;
}

pub struct FfmpegRemuxer {
    ffmpeg_path: String,
    timeout: Duration,
}

impl FfmpegRemuxer {
    pub fn new(ffmpeg_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Remuxer for FfmpegRemuxer {
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffmpeg",
        process.executable.path = %self.ffmpeg_path,
        ffmpeg.operation = "faststart"
    ))]
    async fn remux(&self, input: &Path, output: &Path) -> Result<(), RemuxError> {
        let start = std::time::Instant::now();

        let mut command = Command::new(&self.ffmpeg_path);
        command
            .args(["-y", "-v", "error", "-i"])
            .arg(input)
            .args(["-c", "copy", "-movflags", "+faststart", "-f", "mp4"])
            .arg(output);

        run_tool("ffmpeg", command, self.timeout).await?;

        tracing::info!(
            duration_ms = start.elapsed().as_millis(),
            "Fast-start remux completed"
        );
        Ok(())
    }
}
