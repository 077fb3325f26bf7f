//! Wire-level error taxonomy.
//!
//! Every failure response carries a JSON [`ErrorBody`] with a human-readable
//! message and a machine-readable [`ErrorKind`]. The kind is what clients
//! branch on; the message is for humans and never contains server-side
//! absolute paths.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of a failed request.
///
/// Authentication and authorization failures are deliberately distinct: a 401
/// means the credential itself was rejected, a 403 means the identity is
/// valid but lacks the operation's permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or invalid credential.
    #[error("authentication failure")]
    Authentication,

    /// Valid identity without the required permission.
    #[error("authorization failure")]
    Authorization,

    /// The requested path resolves outside the uploads root.
    #[error("path escape")]
    PathEscape,

    /// The target file or directory does not exist.
    #[error("not found")]
    NotFound,

    /// The target exists but is not a directory.
    #[error("not a directory")]
    NotADirectory,

    /// Malformed request: missing parameter, bad body, empty field.
    #[error("validation failure")]
    Validation,

    /// Underlying filesystem or I/O error.
    #[error("i/o failure")]
    Io,
}

/// JSON body of every failure response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable description.
    pub error: String,
    /// Machine-readable classification.
    pub kind: ErrorKind,
}

impl ErrorBody {
    /// Create an error body from a kind and message.
    pub fn new(kind: ErrorKind, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::PathEscape).unwrap();
        assert_eq!(json, "\"path_escape\"");

        let json = serde_json::to_string(&ErrorKind::NotADirectory).unwrap();
        assert_eq!(json, "\"not_a_directory\"");
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            ErrorKind::Authentication,
            ErrorKind::Authorization,
            ErrorKind::PathEscape,
            ErrorKind::NotFound,
            ErrorKind::NotADirectory,
            ErrorKind::Validation,
            ErrorKind::Io,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            let restored: ErrorKind = serde_json::from_str(&json).unwrap();
            assert_eq!(restored, kind);
        }
    }

    #[test]
    fn test_body_shape() {
        let body = ErrorBody::new(ErrorKind::NotFound, "file not found: /docs/a.txt");
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"kind\":\"not_found\""));
        assert!(json.contains("file not found"));
    }

    #[test]
    fn test_authentication_distinct_from_authorization() {
        // The two must never collapse into one wire value.
        let auth = serde_json::to_string(&ErrorKind::Authentication).unwrap();
        let authz = serde_json::to_string(&ErrorKind::Authorization).unwrap();
        assert_ne!(auth, authz);
    }
}
