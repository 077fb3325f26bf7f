//! Credential resolution for the Depot client.
//!
//! Credentials come from three sources, in order of precedence: explicit
//! values, environment variables (`DEPOT_ENDPOINT`, `DEPOT_USERNAME`,
//! `DEPOT_PASSWORD`), and the credentials file (default
//! `~/.depot/credentials.json`). The file stores the password base64-encoded
//! to keep it out of casual view; it is an encoding, not encryption, and the
//! file should be protected by filesystem permissions.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while resolving or saving credentials.
#[derive(Debug, Error)]
pub enum CredentialsError {
    /// No source supplied one of endpoint, username, or password.
    #[error("missing Depot credentials (endpoint, username, password)")]
    Incomplete,

    /// The credentials file exists but cannot be parsed.
    #[error("failed to parse credentials file: {0}")]
    Parse(#[from] serde_json::Error),

    /// The stored password is not valid base64.
    #[error("credentials file contains an invalid encoded password")]
    InvalidEncoding,

    /// Underlying filesystem error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// On-disk shape of the credentials file.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CredentialsFile {
    endpoint: String,
    username: String,
    #[serde(rename = "encodedPassword")]
    encoded_password: String,
}

/// A complete set of credentials for one Depot server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub endpoint: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Build credentials from explicit values.
    pub fn new(
        endpoint: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// Resolve credentials from explicit values, the environment, and the
    /// credentials file, in that order.
    ///
    /// Each field falls back independently, so an explicit endpoint can be
    /// combined with a file-stored password.
    pub fn resolve(
        endpoint: Option<String>,
        username: Option<String>,
        password: Option<String>,
        credentials_file: Option<&Path>,
    ) -> Result<Self, CredentialsError> {
        let mut endpoint = endpoint.or_else(|| non_empty_env("DEPOT_ENDPOINT"));
        let mut username = username.or_else(|| non_empty_env("DEPOT_USERNAME"));
        let mut password = password.or_else(|| non_empty_env("DEPOT_PASSWORD"));

        if endpoint.is_none() || username.is_none() || password.is_none() {
            if let Some(stored) = load_file(credentials_file)? {
                endpoint = endpoint.or(Some(stored.endpoint));
                username = username.or(Some(stored.username));
                password = password.or(Some(stored.password));
            }
        }

        match (endpoint, username, password) {
            (Some(endpoint), Some(username), Some(password)) => Ok(Self {
                endpoint: endpoint.trim_end_matches('/').to_string(),
                username,
                password,
            }),
            _ => Err(CredentialsError::Incomplete),
        }
    }

    /// Save these credentials to `path` (or the default location), creating
    /// parent directories as needed.
    pub fn save(&self, path: Option<&Path>) -> Result<PathBuf, CredentialsError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_credentials_path(),
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = CredentialsFile {
            endpoint: self.endpoint.clone(),
            username: self.username.clone(),
            encoded_password: BASE64.encode(self.password.as_bytes()),
        };
        fs::write(&path, serde_json::to_string_pretty(&file)?)?;
        Ok(path)
    }
}

/// Default credentials file location: `~/.depot/credentials.json`.
pub fn default_credentials_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".depot")
        .join("credentials.json")
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn load_file(path: Option<&Path>) -> Result<Option<Credentials>, CredentialsError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => default_credentials_path(),
    };
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(&path)?;
    let file: CredentialsFile = serde_json::from_str(&contents)?;
    let password = BASE64
        .decode(&file.encoded_password)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or(CredentialsError::InvalidEncoding)?;

    Ok(Some(Credentials {
        endpoint: file.endpoint,
        username: file.username,
        password,
    }))
}
