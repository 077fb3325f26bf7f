//! Streaming file transfer with atomic finalization.
//!
//! Uploads are written incrementally to a hidden temp file in the
//! destination directory and renamed into place only after the source
//! stream ends cleanly, so a partially received upload is never visible
//! under its final name. Memory use is O(chunk) regardless of file size.
//!
//! Downloads are a thin [`ReaderStream`] over the opened file: chunks are
//! forwarded in order and the handle is dropped as soon as the consumer
//! goes away.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::warn;

use super::gateway::{FileGateway, GatewayError};

/// Errors produced by streaming transfers.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Path resolution or metadata failure.
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The upload's declared filename is unusable.
    #[error("invalid filename: {0}")]
    InvalidFilename(String),

    /// The source stream failed mid-transfer.
    #[error("upload stream failed: {0}")]
    Stream(String),

    /// Underlying filesystem error.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

/// Receive an upload stream into `dir`/`filename` under the gateway's root.
///
/// `filename` comes from the upload itself and is untrusted: the combined
/// target re-passes the sandbox here even when the caller already validated
/// `dir`. Returns the final path on success. On any failure the temp file is
/// removed and nothing appears under the final name.
pub async fn receive_file<S, E>(
    gateway: &FileGateway,
    dir: &str,
    filename: &str,
    stream: S,
) -> Result<PathBuf, TransferError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
{
    if filename.is_empty() {
        return Err(TransferError::InvalidFilename(filename.to_string()));
    }

    // Second gate: the filename may itself contain traversal segments.
    let combined = format!("{}/{}", dir.trim_end_matches('/'), filename);
    let target = gateway.resolve(&combined)?;
    if target == gateway.root() {
        return Err(TransferError::InvalidFilename(filename.to_string()));
    }

    let parent = target
        .parent()
        .ok_or_else(|| TransferError::InvalidFilename(filename.to_string()))?;
    fs::create_dir_all(parent).await?;

    let temp_path = temp_path_for(&target);
    let mut file = File::create(&temp_path).await?;

    let result = write_stream(&mut file, stream).await;
    drop(file);

    match result {
        Ok(()) => {
            fs::rename(&temp_path, &target).await?;
            Ok(target)
        }
        Err(err) => {
            if let Err(cleanup) = fs::remove_file(&temp_path).await {
                warn!(path = ?temp_path, error = %cleanup, "failed to remove temp file after aborted upload");
            }
            Err(err)
        }
    }
}

async fn write_stream<S, E>(file: &mut File, stream: S) -> Result<(), TransferError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
{
    let mut stream = std::pin::pin!(stream);
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| TransferError::Stream(e.to_string()))?;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(())
}

/// Hidden temp name in the same directory as the target, so the final rename
/// never crosses a filesystem boundary.
fn temp_path_for(target: &Path) -> PathBuf {
    let name = target
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    target.with_file_name(format!(".{}.{:08x}.part", name, rand::random::<u32>()))
}

/// Wrap an open file in an ordered chunk stream for a download response.
pub fn download_stream(file: File) -> ReaderStream<File> {
    ReaderStream::new(file)
}
