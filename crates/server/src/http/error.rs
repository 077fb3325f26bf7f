//! Mapping from internal errors to HTTP responses.
//!
//! Every failure leaving the HTTP surface becomes a fixed status code plus a
//! JSON [`ErrorBody`]. Messages reference client-relative paths only; the
//! server's absolute paths never appear in a response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use protocol::{ErrorBody, ErrorKind};

use crate::auth::StoreError;
use crate::files::{GatewayError, TransferError};

/// A request failure, carrying everything needed to render the response.
#[derive(Debug)]
pub enum ApiError {
    /// Missing or rejected credential (401).
    Unauthenticated,

    /// Valid identity without the required permission (403). Deliberately
    /// carries no target information, so denial cannot leak existence.
    Forbidden,

    /// Sandbox violation (403, distinguishable kind).
    PathEscape(String),

    /// Missing target (404).
    NotFound(String),

    /// Target is not a directory (400).
    NotADirectory(String),

    /// Malformed request (400).
    Validation(String),

    /// Filesystem or other internal failure (500).
    Internal(String),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, ErrorKind, String) {
        match self {
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                ErrorKind::Authentication,
                "invalid credentials".to_string(),
            ),
            ApiError::Forbidden => (
                StatusCode::FORBIDDEN,
                ErrorKind::Authorization,
                "forbidden".to_string(),
            ),
            ApiError::PathEscape(path) => (
                StatusCode::FORBIDDEN,
                ErrorKind::PathEscape,
                format!("path {path:?} escapes the uploads root"),
            ),
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                ErrorKind::NotFound,
                format!("not found: {what}"),
            ),
            ApiError::NotADirectory(path) => (
                StatusCode::BAD_REQUEST,
                ErrorKind::NotADirectory,
                format!("not a directory: {path}"),
            ),
            ApiError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, ErrorKind::Validation, msg.clone())
            }
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Io, msg.clone())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = self.parts();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(%message, "request failed");
        }
        (status, Json(ErrorBody::new(kind, message))).into_response()
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::Escapes(e) => ApiError::PathEscape(match e {
                crate::files::SandboxError::Escapes(path) => path,
            }),
            GatewayError::NotFound(path) => ApiError::NotFound(path),
            GatewayError::NotADirectory(path) => ApiError::NotADirectory(path),
            GatewayError::NotAFile(path) => ApiError::Validation(format!("not a file: {path}")),
            GatewayError::AlreadyExists(path) => {
                ApiError::Validation(format!("already exists: {path}"))
            }
            GatewayError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<TransferError> for ApiError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Gateway(e) => e.into(),
            TransferError::InvalidFilename(name) => {
                ApiError::Validation(format!("invalid filename: {name:?}"))
            }
            TransferError::Stream(msg) => ApiError::Internal(msg),
            TransferError::Io(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UserExists(_) | StoreError::RoleExists(_) => {
                ApiError::Validation(err.to_string())
            }
            StoreError::UserNotFound(_) | StoreError::RoleNotFound(_) => {
                ApiError::NotFound(err.to_string())
            }
            StoreError::Validation(msg) => ApiError::Validation(msg),
            StoreError::Parse(e) => ApiError::Internal(e.to_string()),
            StoreError::LockPoisoned { .. } | StoreError::Io(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}
