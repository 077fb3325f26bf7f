//! Path sandboxing for client-supplied paths.
//!
//! Every path a client sends is relative to the configured uploads root.
//! [`resolve`] is the single gate between untrusted input and the
//! filesystem: it joins the input onto the root, normalizes the result
//! **lexically** (no filesystem access, no symlink resolution), and rejects
//! anything that falls outside the root.
//!
//! Resolution is lexical so that a rejected path provably causes no
//! filesystem call, and so the gate also covers targets that do not exist
//! yet (upload destinations, new directories). The root itself is
//! canonicalized once at startup by the gateway, which keeps the prefix
//! check meaningful.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Errors produced by path resolution.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SandboxError {
    /// The path resolves outside the uploads root.
    #[error("path {0:?} escapes the uploads root")]
    Escapes(String),
}

/// Resolve a client-relative path against `root`.
///
/// Leading separators are stripped so the input cannot override the root on
/// join. `.` and `..` segments are resolved lexically; `..` segments that
/// stay under the root are legal (`a/../b`), ones that would climb above it
/// are not. The empty path resolves to the root itself.
pub fn resolve(root: &Path, relative: &str) -> Result<PathBuf, SandboxError> {
    let trimmed = relative.trim_start_matches(['/', '\\']);
    let normalized = normalize_lexical(&root.join(trimmed));

    if normalized.starts_with(root) {
        Ok(normalized)
    } else {
        Err(SandboxError::Escapes(relative.to_string()))
    }
}

/// Resolve `.` and `..` components without touching the filesystem.
///
/// A `..` at the filesystem root is clamped (cannot climb above `/`), which
/// matches how the kernel resolves `/..`.
fn normalize_lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(Component::RootDir),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(segment) => out.push(segment),
        }
    }
    out
}
