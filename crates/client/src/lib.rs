//! # Depot Client Library
//!
//! Client-side access to a Depot server: credential resolution and a typed,
//! streaming HTTP client.
//!
//! ## Example
//!
//! ```rust,no_run
//! use client::{Credentials, DepotClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Explicit values override DEPOT_* env vars, which override the
//!     // credentials file.
//!     let credentials = Credentials::resolve(None, None, None, None)?;
//!     let depot = DepotClient::new(credentials)?;
//!
//!     depot.mkdir("/logs", true).await?;
//!     depot.write_file("/logs/app.log", b"started".to_vec()).await?;
//!     for name in depot.list("/logs").await? {
//!         println!("{name}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod credentials;

pub use client::{upload_file, ClientError, DepotClient};
pub use credentials::{default_credentials_path, Credentials, CredentialsError};
