//! Credential verification and permission checks.
//!
//! Every request is authenticated independently; there are no sessions or
//! tokens. Authentication produces an explicit [`Identity`] value that is
//! threaded through the call chain rather than stashed in ambient request
//! state. All lookups fail closed: an absent user, role, or permission is a
//! denial.

use std::sync::Arc;

use bcrypt::BcryptError;

use super::store::UserStore;

/// bcrypt cost factor for newly hashed passwords.
pub const HASH_COST: u32 = 10;

/// An authenticated username, established once per request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    username: String,
}

impl Identity {
    /// Wrap a verified username.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    /// The authenticated username.
    pub fn username(&self) -> &str {
        &self.username
    }
}

/// Answers "is this credential valid" and "does this identity hold
/// permission P" against the user store.
pub struct AuthService {
    store: Arc<UserStore>,
}

impl AuthService {
    /// Create a service over the given store.
    pub fn new(store: Arc<UserStore>) -> Self {
        Self { store }
    }

    /// Verify a username/secret pair against the stored bcrypt hash.
    ///
    /// Unknown users, store failures, and malformed hashes all yield
    /// `false`; bcrypt itself provides the slow, salted comparison.
    pub fn verify_credentials(&self, username: &str, secret: &str) -> bool {
        let Ok(Some(user)) = self.store.get_user(username) else {
            return false;
        };
        bcrypt::verify(secret, &user.hashed_password).unwrap_or(false)
    }

    /// Test whether the user's role grants `permission`.
    pub fn check_permission(&self, identity: &Identity, permission: &str) -> bool {
        let Ok(Some(user)) = self.store.get_user(identity.username()) else {
            return false;
        };
        let Ok(permissions) = self.store.role_permissions(&user.role) else {
            return false;
        };
        permissions.iter().any(|p| p == permission)
    }
}

/// Hash a plaintext password for storage.
pub fn hash_password(password: &str) -> Result<String, BcryptError> {
    bcrypt::hash(password, HASH_COST)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::store::UserRecord;
    use tempfile::TempDir;

    // Minimum cost keeps the tests fast; production hashing uses HASH_COST.
    fn test_hash(password: &str) -> String {
        bcrypt::hash(password, 4).unwrap()
    }

    fn service_with_alice() -> (TempDir, AuthService) {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(UserStore::load(temp.path().join("users.json")).unwrap());
        store
            .add_user(UserRecord {
                username: "alice".to_string(),
                hashed_password: test_hash("s3cret"),
                role: "editor".to_string(),
            })
            .unwrap();
        store
            .add_role("editor", vec!["read".to_string(), "write".to_string()])
            .unwrap();
        (temp, AuthService::new(store))
    }

    #[test]
    fn test_verify_correct_password() {
        let (_temp, auth) = service_with_alice();
        assert!(auth.verify_credentials("alice", "s3cret"));
    }

    #[test]
    fn test_verify_wrong_password() {
        let (_temp, auth) = service_with_alice();
        assert!(!auth.verify_credentials("alice", "wrong"));
    }

    #[test]
    fn test_verify_unknown_user_fails_closed() {
        let (_temp, auth) = service_with_alice();
        assert!(!auth.verify_credentials("mallory", "s3cret"));
    }

    #[test]
    fn test_verify_malformed_hash_fails_closed() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(UserStore::load(temp.path().join("users.json")).unwrap());
        store
            .add_user(UserRecord {
                username: "broken".to_string(),
                hashed_password: "not-a-bcrypt-hash".to_string(),
                role: "editor".to_string(),
            })
            .unwrap();
        let auth = AuthService::new(store);
        assert!(!auth.verify_credentials("broken", "anything"));
    }

    #[test]
    fn test_permission_granted() {
        let (_temp, auth) = service_with_alice();
        let alice = Identity::new("alice");
        assert!(auth.check_permission(&alice, "read"));
        assert!(auth.check_permission(&alice, "write"));
    }

    #[test]
    fn test_permission_not_in_role() {
        let (_temp, auth) = service_with_alice();
        let alice = Identity::new("alice");
        assert!(!auth.check_permission(&alice, "manageUsers"));
    }

    #[test]
    fn test_permission_unknown_user_fails_closed() {
        let (_temp, auth) = service_with_alice();
        assert!(!auth.check_permission(&Identity::new("mallory"), "read"));
    }

    #[test]
    fn test_permission_unknown_role_fails_closed() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(UserStore::load(temp.path().join("users.json")).unwrap());
        store
            .add_user(UserRecord {
                username: "orphan".to_string(),
                hashed_password: test_hash("pw"),
                role: "missing-role".to_string(),
            })
            .unwrap();
        let auth = AuthService::new(store);
        assert!(!auth.check_permission(&Identity::new("orphan"), "read"));
    }

    #[test]
    fn test_updated_role_reflected_immediately() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(UserStore::load(temp.path().join("users.json")).unwrap());
        store
            .add_user(UserRecord {
                username: "alice".to_string(),
                hashed_password: test_hash("pw"),
                role: "editor".to_string(),
            })
            .unwrap();
        store.add_role("editor", vec!["read".to_string()]).unwrap();

        let auth = AuthService::new(store.clone());
        let alice = Identity::new("alice");
        assert!(!auth.check_permission(&alice, "write"));

        store
            .update_role("editor", vec!["read".to_string(), "write".to_string()])
            .unwrap();
        assert!(auth.check_permission(&alice, "write"));
    }

    #[test]
    fn test_hash_password_verifies() {
        let hash = hash_password("hunter2").unwrap();
        assert!(bcrypt::verify("hunter2", &hash).unwrap());
        assert!(!bcrypt::verify("hunter3", &hash).unwrap());
    }
}
