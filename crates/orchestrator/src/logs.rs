//! Container log scanning.
//!
//! [`grep_log`] answers "did this pattern show up before the deadline". A
//! stream that ends without a match (container exited, or caught up without
//! following) is a `false`, never a `true`: the match flag alone decides.

use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use qnet_core::metrics as m;
use regex::Regex;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::docker::DockerClient;
use crate::error::OrchestratorError;
use crate::types::short_id;

/// Compiles a log pattern.
pub fn compile_pattern(pattern: &str) -> Result<Regex, OrchestratorError> {
    Regex::new(pattern).map_err(|e| OrchestratorError::InvalidPattern {
        pattern: pattern.to_owned(),
        reason: e.to_string(),
    })
}

/// Follows the log of `container_id` until `pattern` matches, the stream ends,
/// or `timeout` elapses.
pub async fn grep_log<D: DockerClient>(
    client: &D,
    container_id: &str,
    pattern: &str,
    timeout: Duration,
) -> Result<bool, OrchestratorError> {
    let regex = compile_pattern(pattern)?;
    let stream = client.log_stream(container_id, true);

    let found = scan_stream(stream, &regex, timeout).await?;
    if found {
        metrics::counter!(m::ORCHESTRATOR_LOG_MATCHES_TOTAL).increment(1);
    }
    debug!(
        container_id = short_id(container_id),
        pattern,
        found,
        "log scan finished"
    );
    Ok(found)
}

/// Scans frames until the first match. Dropping the stream on return closes
/// the daemon subscription.
pub(crate) async fn scan_stream(
    mut stream: BoxStream<'static, Result<String, OrchestratorError>>,
    regex: &Regex,
    timeout: Duration,
) -> Result<bool, OrchestratorError> {
    let scan = async {
        while let Some(frame) = stream.next().await {
            if regex.is_match(&frame?) {
                return Ok(true);
            }
        }
        Ok::<_, OrchestratorError>(false)
    };

    match tokio::time::timeout(timeout, scan).await {
        Ok(result) => result,
        Err(_) => Ok(false),
    }
}

/// Writes the current log of `container_id` to `writer`, one frame per line.
///
/// Returns the number of frames written.
pub async fn stream_logs<D, W>(
    client: &D,
    container_id: &str,
    writer: &mut W,
) -> Result<u64, OrchestratorError>
where
    D: DockerClient,
    W: AsyncWrite + Unpin,
{
    let mut stream = client.log_stream(container_id, false);
    let mut frames = 0u64;

    while let Some(frame) = stream.next().await {
        let frame = frame?;
        writer.write_all(frame.as_bytes()).await?;
        if !frame.ends_with('\n') {
            writer.write_all(b"\n").await?;
        }
        frames += 1;
    }

    writer.flush().await?;
    Ok(frames)
}
