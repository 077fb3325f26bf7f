//! # Depot Server Library
//!
//! This crate provides the server side of Depot: a single directory tree
//! exposed as a remote, authenticated filesystem over HTTP.
//!
//! ## Overview
//!
//! - **Path sandbox**: every client-supplied path resolves through a single
//!   lexical gate that keeps it inside the configured uploads root
//! - **User store**: file-backed users and roles with atomic persistence
//! - **Authorizer**: bcrypt credential checks and fail-closed role→permission
//!   lookups
//! - **File gateway**: list/read/mkdir against the sandboxed root
//! - **Transfer**: streaming uploads (temp-then-rename) and downloads
//! - **HTTP surface**: axum routes gating every operation behind
//!   authenticate → authorize → resolve → execute
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use server::auth::UserStore;
//! use server::files::FileGateway;
//! use server::http::{router, AppState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let gateway = Arc::new(FileGateway::new("./uploads")?);
//!     let store = Arc::new(UserStore::load("./users.json")?);
//!     let app = router(AppState::new(gateway, store), 100 * 1024 * 1024);
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod files;
pub mod http;

pub use auth::{AuthService, Identity, UserStore};
pub use config::Config;
pub use files::FileGateway;
