//! Bounded execution of external media tools.

use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

const STDERR_EXCERPT_CHARS: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} did not finish within {timeout:?}")]
    Timeout { tool: String, timeout: Duration },

    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
    },
}

/// Run `command` to completion, killing it if it outlives `timeout`.
///
/// stdout and stderr are captured. A non-zero exit becomes `ToolError::Failed`
/// carrying the start of stderr.
pub async fn run_tool(
    tool: &str,
    mut command: Command,
    timeout: Duration,
) -> Result<Output, ToolError> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = command.spawn().map_err(|source| ToolError::Spawn {
        tool: tool.to_string(),
        source,
    })?;

    // Dropping the future on timeout drops the child, which kills it.
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|source| ToolError::Spawn {
            tool: tool.to_string(),
            source,
        })?,
        Err(_) => {
            return Err(ToolError::Timeout {
                tool: tool.to_string(),
                timeout,
            })
        }
    };

    if !output.status.success() {
        return Err(ToolError::Failed {
            tool: tool.to_string(),
            status: output.status.to_string(),
            stderr: stderr_excerpt(&output.stderr),
        });
    }

    Ok(output)
}

fn stderr_excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    match trimmed.char_indices().nth(STDERR_EXCERPT_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
