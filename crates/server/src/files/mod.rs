//! Sandboxed file access: path resolution, gateway operations, and
//! streaming transfer.

pub mod gateway;
pub mod sandbox;
pub mod transfer;

pub use gateway::{FileGateway, GatewayError};
pub use sandbox::SandboxError;
pub use transfer::{download_stream, receive_file, TransferError};
