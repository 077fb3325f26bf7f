//! HTTP client for a Depot server.
//!
//! [`DepotClient`] is an explicitly constructed handle: build one from
//! [`Credentials`] and pass it where it is needed. Uploads and downloads
//! stream chunk by chunk; nothing buffers whole files in memory.

use std::path::Path;

use futures_util::StreamExt;
use protocol::{ErrorBody, ErrorKind, ListFilesResponse, MessageResponse, MkdirOptions};
use reqwest::StatusCode;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::io::ReaderStream;

use crate::credentials::{Credentials, CredentialsError};

/// Errors produced by client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server rejected the request.
    ///
    /// `kind` is present when the body was a Depot error payload.
    #[error("server error ({status}): {message}")]
    Server {
        status: u16,
        kind: Option<ErrorKind>,
        message: String,
    },

    /// A remote path that cannot name a file (empty, or ends in `/`).
    #[error("invalid remote path: {0:?}")]
    InvalidPath(String),

    /// Transport-level failure.
    #[error("http transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Credential resolution failure.
    #[error(transparent)]
    Credentials(#[from] CredentialsError),

    /// Local filesystem error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Handle to one Depot server.
pub struct DepotClient {
    http: reqwest::Client,
    credentials: Credentials,
}

impl DepotClient {
    /// Build a client from resolved credentials.
    pub fn new(credentials: Credentials) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http, credentials })
    }

    /// The username requests are issued as.
    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.credentials.endpoint, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.url(path))
            .basic_auth(&self.credentials.username, Some(&self.credentials.password))
    }

    /// List the entries of a remote directory.
    pub async fn list(&self, dir: &str) -> Result<Vec<String>, ClientError> {
        let resp = self
            .request(reqwest::Method::GET, "/files/ls")
            .query(&[("dir", dir)])
            .send()
            .await?;
        let resp = check(resp).await?;
        Ok(resp.json::<ListFilesResponse>().await?.files)
    }

    /// Read a whole remote file into memory.
    pub async fn read_file(&self, path: &str) -> Result<Vec<u8>, ClientError> {
        let resp = self
            .request(reqwest::Method::GET, "/files/readFile")
            .query(&[("path", path)])
            .send()
            .await?;
        let resp = check(resp).await?;
        Ok(resp.bytes().await?.to_vec())
    }

    /// Stream a remote file into `writer`. Returns the byte count.
    pub async fn download_to<W>(&self, path: &str, mut writer: W) -> Result<u64, ClientError>
    where
        W: AsyncWrite + Unpin,
    {
        let resp = self
            .request(reqwest::Method::GET, "/files/readFile")
            .query(&[("path", path)])
            .send()
            .await?;
        let resp = check(resp).await?;

        let mut stream = resp.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;
        tracing::debug!(path, written, "download complete");
        Ok(written)
    }

    /// Write a byte buffer to a remote path.
    pub async fn write_file(
        &self,
        remote_path: &str,
        content: Vec<u8>,
    ) -> Result<(), ClientError> {
        let (dir, name) = split_remote_path(remote_path)?;
        let part = reqwest::multipart::Part::bytes(content).file_name(name.to_string());
        self.send_upload(dir, part).await
    }

    /// Stream a reader to a remote path without buffering it whole.
    pub async fn upload_stream<R>(&self, remote_path: &str, reader: R) -> Result<(), ClientError>
    where
        R: AsyncRead + Send + Sync + 'static,
    {
        let (dir, name) = split_remote_path(remote_path)?;
        let body = reqwest::Body::wrap_stream(ReaderStream::new(reader));
        let part = reqwest::multipart::Part::stream(body).file_name(name.to_string());
        self.send_upload(dir, part).await
    }

    async fn send_upload(
        &self,
        dir: &str,
        part: reqwest::multipart::Part,
    ) -> Result<(), ClientError> {
        let form = reqwest::multipart::Form::new().part("file", part);
        let resp = self
            .request(reqwest::Method::POST, "/files/writeFile")
            .query(&[("path", dir)])
            .multipart(form)
            .send()
            .await?;
        check(resp).await?;
        tracing::debug!(dir, "upload complete");
        Ok(())
    }

    /// Create a remote directory.
    pub async fn mkdir(&self, path: &str, recursive: bool) -> Result<(), ClientError> {
        let resp = self
            .request(reqwest::Method::POST, "/files/mkdir")
            .query(&[("path", path)])
            .json(&MkdirOptions { recursive })
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    /// Add a user (requires `manageUsers`).
    pub async fn add_user(
        &self,
        username: &str,
        password: &str,
        role: &str,
    ) -> Result<String, ClientError> {
        let resp = self
            .request(reqwest::Method::POST, "/users")
            .json(&serde_json::json!({
                "username": username, "password": password, "role": role
            }))
            .send()
            .await?;
        message_of(resp).await
    }

    /// Update a user's password and/or role (requires `manageUsers`).
    pub async fn update_user(
        &self,
        username: &str,
        password: Option<&str>,
        role: Option<&str>,
    ) -> Result<String, ClientError> {
        let resp = self
            .request(reqwest::Method::PATCH, &format!("/users/{username}"))
            .json(&serde_json::json!({ "password": password, "role": role }))
            .send()
            .await?;
        message_of(resp).await
    }

    /// Delete a user (requires `manageUsers`).
    pub async fn delete_user(&self, username: &str) -> Result<String, ClientError> {
        let resp = self
            .request(reqwest::Method::DELETE, &format!("/users/{username}"))
            .send()
            .await?;
        message_of(resp).await
    }

    /// Add a role (requires `manageUsers`).
    pub async fn add_role(
        &self,
        role: &str,
        permissions: &[String],
    ) -> Result<String, ClientError> {
        let resp = self
            .request(reqwest::Method::POST, "/users/roles")
            .json(&serde_json::json!({ "role": role, "permissions": permissions }))
            .send()
            .await?;
        message_of(resp).await
    }

    /// Replace a role's permissions (requires `manageUsers`).
    pub async fn update_role(
        &self,
        role: &str,
        permissions: &[String],
    ) -> Result<String, ClientError> {
        let resp = self
            .request(reqwest::Method::PATCH, &format!("/users/roles/{role}"))
            .json(&serde_json::json!({ "permissions": permissions }))
            .send()
            .await?;
        message_of(resp).await
    }

    /// Delete a role (requires `manageUsers`).
    pub async fn delete_role(&self, role: &str) -> Result<String, ClientError> {
        let resp = self
            .request(reqwest::Method::DELETE, &format!("/users/roles/{role}"))
            .send()
            .await?;
        message_of(resp).await
    }
}

/// Split a remote file path into its parent directory and basename.
fn split_remote_path(path: &str) -> Result<(&str, &str), ClientError> {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ClientError::InvalidPath(path.to_string()));
    }
    match trimmed.rfind('/') {
        Some(idx) => {
            let (dir, name) = trimmed.split_at(idx);
            let name = &name[1..];
            if name.is_empty() {
                return Err(ClientError::InvalidPath(path.to_string()));
            }
            Ok((if dir.is_empty() { "/" } else { dir }, name))
        }
        None => Ok(("/", trimmed)),
    }
}

/// Turn a non-success response into a typed [`ClientError`].
async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(parse_error(status, &body))
}

async fn message_of(resp: reqwest::Response) -> Result<String, ClientError> {
    let resp = check(resp).await?;
    Ok(resp.json::<MessageResponse>().await?.message)
}

fn parse_error(status: StatusCode, body: &str) -> ClientError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => ClientError::Server {
            status: status.as_u16(),
            kind: Some(parsed.kind),
            message: parsed.error,
        },
        Err(_) => ClientError::Server {
            status: status.as_u16(),
            kind: None,
            message: if body.is_empty() {
                status.to_string()
            } else {
                body.to_string()
            },
        },
    }
}

/// Copy a local file to a remote path, streaming its content.
pub async fn upload_file(
    client: &DepotClient,
    local: &Path,
    remote_path: &str,
) -> Result<(), ClientError> {
    let file = tokio::fs::File::open(local).await?;
    client.upload_stream(remote_path, file).await
}
