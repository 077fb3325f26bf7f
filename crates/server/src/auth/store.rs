//! File-backed user and role storage.
//!
//! Users and roles live in a single JSON file:
//!
//! ```json
//! {
//!   "users": [{"username": "alice", "hashedPassword": "...", "role": "editor"}],
//!   "roles": {"editor": ["read", "write"]}
//! }
//! ```
//!
//! The table is held in memory behind an `RwLock`; every mutation validates
//! the structure and persists with a write-temp-then-rename, so a concurrent
//! reader of the file observes either the pre- or post-mutation state, never
//! a torn write.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Errors produced by the user store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A user with this name already exists.
    #[error("user {0} already exists")]
    UserExists(String),

    /// No user with this name.
    #[error("user {0} not found")]
    UserNotFound(String),

    /// A role with this name already exists.
    #[error("role {0} already exists")]
    RoleExists(String),

    /// No role with this name.
    #[error("role {0} not found")]
    RoleNotFound(String),

    /// Structural validation failed.
    #[error("invalid user data: {0}")]
    Validation(String),

    /// The users file could not be parsed.
    #[error("failed to parse users file: {0}")]
    Parse(#[from] serde_json::Error),

    /// Lock poisoned by a panicking writer.
    #[error("lock poisoned: {context}")]
    LockPoisoned { context: &'static str },

    /// Underlying filesystem error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// A stored user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    #[serde(rename = "hashedPassword")]
    pub hashed_password: String,
    pub role: String,
}

/// Partial update for a user. `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub hashed_password: Option<String>,
    pub role: Option<String>,
}

/// On-disk shape of the users file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct UserFile {
    users: Vec<UserRecord>,
    roles: HashMap<String, Vec<String>>,
}

impl UserFile {
    fn validate(&self) -> Result<(), StoreError> {
        for user in &self.users {
            validate_record(user)?;
        }
        for (role, permissions) in &self.roles {
            if role.is_empty() {
                return Err(StoreError::Validation("role name is empty".to_string()));
            }
            if permissions.iter().any(|p| p.is_empty()) {
                return Err(StoreError::Validation(format!(
                    "role {role} contains an empty permission"
                )));
            }
        }
        Ok(())
    }
}

fn validate_record(user: &UserRecord) -> Result<(), StoreError> {
    if user.username.is_empty() {
        return Err(StoreError::Validation("username is empty".to_string()));
    }
    if user.hashed_password.is_empty() {
        return Err(StoreError::Validation(format!(
            "user {} has an empty password hash",
            user.username
        )));
    }
    if user.role.is_empty() {
        return Err(StoreError::Validation(format!(
            "user {} has an empty role",
            user.username
        )));
    }
    Ok(())
}

/// Thread-safe user/role table persisted to a JSON file.
pub struct UserStore {
    path: PathBuf,
    table: RwLock<UserFile>,
}

impl UserStore {
    /// Load the store from `path`, creating an empty file if absent.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let empty = UserFile::default();
            fs::write(&path, serde_json::to_string_pretty(&empty)?)?;
            debug!(path = ?path, "created empty users file");
            return Ok(Self {
                path,
                table: RwLock::new(empty),
            });
        }

        let contents = fs::read_to_string(&path)?;
        let table: UserFile = serde_json::from_str(&contents)?;
        table.validate()?;

        debug!(path = ?path, users = table.users.len(), roles = table.roles.len(), "loaded users file");
        Ok(Self {
            path,
            table: RwLock::new(table),
        })
    }

    /// Look up a user by name.
    pub fn get_user(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let table = self.read("get_user")?;
        Ok(table.users.iter().find(|u| u.username == username).cloned())
    }

    /// Permission names granted to a role. An unknown role yields the empty
    /// set (fail-closed).
    pub fn role_permissions(&self, role: &str) -> Result<Vec<String>, StoreError> {
        let table = self.read("role_permissions")?;
        Ok(table.roles.get(role).cloned().unwrap_or_default())
    }

    /// Add a user. Fails if the username is taken.
    pub fn add_user(&self, user: UserRecord) -> Result<(), StoreError> {
        validate_record(&user)?;
        let mut table = self.write("add_user")?;
        if table.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::UserExists(user.username));
        }
        table.users.push(user);
        self.save(&table)
    }

    /// Apply a partial update to an existing user.
    pub fn update_user(&self, username: &str, update: UserUpdate) -> Result<(), StoreError> {
        let mut table = self.write("update_user")?;
        let user = table
            .users
            .iter_mut()
            .find(|u| u.username == username)
            .ok_or_else(|| StoreError::UserNotFound(username.to_string()))?;

        if let Some(hash) = update.hashed_password {
            user.hashed_password = hash;
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        validate_record(user)?;
        self.save(&table)
    }

    /// Remove a user. Fails if absent.
    pub fn remove_user(&self, username: &str) -> Result<(), StoreError> {
        let mut table = self.write("remove_user")?;
        let before = table.users.len();
        table.users.retain(|u| u.username != username);
        if table.users.len() == before {
            return Err(StoreError::UserNotFound(username.to_string()));
        }
        self.save(&table)
    }

    /// Add a role. Fails if the role already exists.
    pub fn add_role(&self, role: &str, permissions: Vec<String>) -> Result<(), StoreError> {
        validate_role(role, &permissions)?;
        let mut table = self.write("add_role")?;
        if table.roles.contains_key(role) {
            return Err(StoreError::RoleExists(role.to_string()));
        }
        table.roles.insert(role.to_string(), permissions);
        self.save(&table)
    }

    /// Replace a role's permission set. Fails if the role does not exist.
    pub fn update_role(&self, role: &str, permissions: Vec<String>) -> Result<(), StoreError> {
        validate_role(role, &permissions)?;
        let mut table = self.write("update_role")?;
        if !table.roles.contains_key(role) {
            return Err(StoreError::RoleNotFound(role.to_string()));
        }
        table.roles.insert(role.to_string(), permissions);
        self.save(&table)
    }

    /// Remove a role. Fails if absent.
    pub fn remove_role(&self, role: &str) -> Result<(), StoreError> {
        let mut table = self.write("remove_role")?;
        if table.roles.remove(role).is_none() {
            return Err(StoreError::RoleNotFound(role.to_string()));
        }
        self.save(&table)
    }

    fn read(
        &self,
        context: &'static str,
    ) -> Result<std::sync::RwLockReadGuard<'_, UserFile>, StoreError> {
        self.table
            .read()
            .map_err(|_| StoreError::LockPoisoned { context })
    }

    fn write(
        &self,
        context: &'static str,
    ) -> Result<std::sync::RwLockWriteGuard<'_, UserFile>, StoreError> {
        self.table
            .write()
            .map_err(|_| StoreError::LockPoisoned { context })
    }

    /// Persist the table with a temp-file-then-rename.
    fn save(&self, table: &UserFile) -> Result<(), StoreError> {
        table.validate()?;
        let contents = serde_json::to_string_pretty(table)?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, &contents)?;
        fs::rename(&temp_path, &self.path)?;

        debug!(path = ?self.path, "users file saved");
        Ok(())
    }
}

fn validate_role(role: &str, permissions: &[String]) -> Result<(), StoreError> {
    if role.is_empty() {
        return Err(StoreError::Validation("role name is empty".to_string()));
    }
    if permissions.iter().any(|p| p.is_empty()) {
        return Err(StoreError::Validation(format!(
            "role {role} contains an empty permission"
        )));
    }
    Ok(())
}
