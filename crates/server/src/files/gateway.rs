//! Filesystem operations against the uploads root.
//!
//! The gateway owns the canonical root directory and performs every
//! list/read/mkdir operation behind the path sandbox. No caller may touch
//! the filesystem with a client-supplied path except through this type.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{self, File};

use super::sandbox::{self, SandboxError};

/// Errors produced by gateway operations.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The requested path escapes the uploads root.
    #[error(transparent)]
    Escapes(#[from] SandboxError),

    /// The target does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The target exists but is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// The target exists but is not a regular file.
    #[error("not a file: {0}")]
    NotAFile(String),

    /// The directory already exists and the call was not recursive.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Underlying filesystem error.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl GatewayError {
    fn from_io(err: io::Error, relative: &str) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => GatewayError::NotFound(relative.to_string()),
            io::ErrorKind::AlreadyExists => GatewayError::AlreadyExists(relative.to_string()),
            _ => GatewayError::Io(err),
        }
    }
}

/// Permission-agnostic file access rooted at a fixed directory.
///
/// The root is created if missing and canonicalized once at construction;
/// it is immutable for the lifetime of the process. All operations take
/// client-relative paths and resolve them through the sandbox first.
pub struct FileGateway {
    root: PathBuf,
}

impl FileGateway {
    /// Create a gateway over `root`, creating the directory if needed.
    pub fn new<P: AsRef<Path>>(root: P) -> io::Result<Self> {
        std::fs::create_dir_all(root.as_ref())?;
        let root = std::fs::canonicalize(root.as_ref())?;
        Ok(Self { root })
    }

    /// The canonical uploads root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a client-relative path to an absolute path under the root.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, GatewayError> {
        Ok(sandbox::resolve(&self.root, relative)?)
    }

    /// List the entry names of a directory.
    ///
    /// The returned names carry no order guarantee.
    pub async fn list(&self, dir: &str) -> Result<Vec<String>, GatewayError> {
        let target = self.resolve(dir)?;

        let metadata = fs::metadata(&target)
            .await
            .map_err(|e| GatewayError::from_io(e, dir))?;
        if !metadata.is_dir() {
            return Err(GatewayError::NotADirectory(dir.to_string()));
        }

        let mut entries = fs::read_dir(&target).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        Ok(names)
    }

    /// Open a file for reading, positioned at byte 0.
    ///
    /// Returns the file handle together with its size.
    pub async fn open_read(&self, path: &str) -> Result<(File, u64), GatewayError> {
        let target = self.resolve(path)?;

        let metadata = fs::metadata(&target)
            .await
            .map_err(|e| GatewayError::from_io(e, path))?;
        if !metadata.is_file() {
            return Err(GatewayError::NotAFile(path.to_string()));
        }

        let file = File::open(&target)
            .await
            .map_err(|e| GatewayError::from_io(e, path))?;
        Ok((file, metadata.len()))
    }

    /// Create a directory.
    ///
    /// Non-recursive creation requires the parent to exist and the target to
    /// be absent; recursive creation also succeeds when the directory is
    /// already there.
    pub async fn mkdir(&self, path: &str, recursive: bool) -> Result<(), GatewayError> {
        let target = self.resolve(path)?;

        let result = if recursive {
            fs::create_dir_all(&target).await
        } else {
            fs::create_dir(&target).await
        };
        result.map_err(|e| GatewayError::from_io(e, path))?;

        tracing::debug!(path, recursive, "directory created");
        Ok(())
    }
}
