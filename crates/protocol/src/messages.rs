//! Request and response payloads for the Depot HTTP surface.
//!
//! All bodies are JSON. Field names match the wire format consumed by the
//! client crate and third-party callers, so renames here are breaking.

use serde::{Deserialize, Serialize};

/// Response to `GET /files/ls`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilesResponse {
    /// Entry names within the listed directory, in no particular order.
    pub files: Vec<String>,
}

/// Success response for mutating operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable confirmation.
    pub message: String,
}

impl MessageResponse {
    /// Create a confirmation message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Body of `POST /files/mkdir`.
///
/// The target path travels in the `path` query parameter; the body only
/// carries creation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MkdirOptions {
    /// Create missing parent directories, and succeed if the directory
    /// already exists.
    pub recursive: bool,
}

/// Body of `POST /users`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    /// Plaintext password; hashed server-side before it is stored.
    pub password: String,
    pub role: String,
}

/// Body of `PATCH /users/:username`. Absent fields are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UpdateUserRequest {
    pub password: Option<String>,
    pub role: Option<String>,
}

/// Body of `POST /users/roles`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoleRequest {
    pub role: String,
    pub permissions: Vec<String>,
}

/// Body of `PATCH /users/roles/:role`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateRoleRequest {
    pub permissions: Vec<String>,
}

/// Response to `GET /healthz`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl HealthResponse {
    /// Healthy response stamped with the given crate version.
    pub fn ok(version: &str) -> Self {
        Self {
            status: "ok".to_string(),
            version: version.to_string(),
        }
    }
}
