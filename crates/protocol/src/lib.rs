//! # Depot Protocol Library
//!
//! Shared wire types for the Depot remote filesystem: the error taxonomy
//! returned by the server, the request/response payloads of every HTTP
//! operation, and the well-known permission names.
//!
//! ## Overview
//!
//! Depot exposes a directory tree over HTTP. Both the server and the client
//! crates depend on this crate so that payloads and error kinds stay in sync:
//!
//! - **Error taxonomy**: [`ErrorKind`] and the JSON [`ErrorBody`] carried by
//!   every failure response
//! - **Payloads**: request and response bodies for the `/files` and `/users`
//!   surfaces
//! - **Permissions**: the permission names the server's role tables grant
//!
//! ## Example
//!
//! ```rust
//! use protocol::{ErrorBody, ErrorKind, permissions};
//!
//! let body = ErrorBody::new(ErrorKind::PathEscape, "path escapes the uploads root");
//! let json = serde_json::to_string(&body).unwrap();
//! assert!(json.contains("path_escape"));
//! assert_eq!(permissions::READ, "read");
//! ```

pub mod error;
pub mod messages;

pub use error::{ErrorBody, ErrorKind};
pub use messages::{
    CreateRoleRequest, CreateUserRequest, HealthResponse, ListFilesResponse, MessageResponse,
    MkdirOptions, UpdateRoleRequest, UpdateUserRequest,
};

/// Well-known permission names.
///
/// Role tables are user data and may contain arbitrary strings; an unknown
/// string simply never matches an operation's requirement. These constants
/// are the names the server's routes actually check.
pub mod permissions {
    /// Grants directory listing and file reads.
    pub const READ: &str = "read";
    /// Grants file uploads and directory creation.
    pub const WRITE: &str = "write";
    /// Grants user and role administration.
    pub const MANAGE_USERS: &str = "manageUsers";
}
