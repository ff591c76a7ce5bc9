//! Access control gate: user directory and credential verification.
//!
//! Users live in process memory only (deliberate inherited simplification;
//! they are lost on restart). The directory sits behind the
//! [`UserRepository`] trait so a persistent implementation can be swapped
//! in without touching the gate logic, and registration is an atomic
//! insert-if-absent under the repository lock.
//!
//! Passwords are stored as salted one-way digests built on the SHA-256
//! primitive. No complexity rules, rate limiting, or lockout exist here.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::hash_map::Entry;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Username already exists")]
    UsernameTaken,
    #[error("Invalid credentials")]
    InvalidCredentials,
}

/// The two authorization roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Admin,
    Standard,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Admin => "admin",
            AccountType::Standard => "standard",
        }
    }

    /// Parse a form value; anything that is not exactly "admin" gets the
    /// restricted role.
    pub fn parse(value: &str) -> AccountType {
        if value == "admin" {
            AccountType::Admin
        } else {
            AccountType::Standard
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, AccountType::Admin)
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub username: String,
    pub password_hash: String,
    pub account_type: AccountType,
}

/// Seam for user storage. `insert_if_absent` must be atomic: a duplicate
/// username can never overwrite an existing user, even under concurrent
/// registration.
pub trait UserRepository: Send + Sync {
    fn find(&self, username: &str) -> Option<User>;
    fn insert_if_absent(&self, user: User) -> Result<(), AuthError>;
}

/// In-memory user directory.
#[derive(Default)]
pub struct MemoryUserRepo {
    users: Mutex<FxHashMap<String, User>>,
}

impl UserRepository for MemoryUserRepo {
    fn find(&self, username: &str) -> Option<User> {
        self.users.lock().unwrap().get(username).cloned()
    }

    fn insert_if_absent(&self, user: User) -> Result<(), AuthError> {
        let mut users = self.users.lock().unwrap();
        match users.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(AuthError::UsernameTaken),
            Entry::Vacant(slot) => {
                slot.insert(user);
                Ok(())
            }
        }
    }
}

/// Register a new user. Duplicate usernames fail without overwriting.
pub fn register(
    repo: &dyn UserRepository,
    username: &str,
    password: &str,
    account_type: AccountType,
) -> Result<(), AuthError> {
    tracing::debug!("Attempting to register user: {}", username);
    let user = User {
        username: username.to_string(),
        password_hash: hash_password(password),
        account_type,
    };
    let result = repo.insert_if_absent(user);
    match &result {
        Ok(()) => tracing::debug!(
            "User registered: {} with account type: {}",
            username,
            account_type.as_str()
        ),
        Err(_) => tracing::warn!("Username already exists: {}", username),
    }
    result
}

/// Verify credentials against the stored hash. An unknown username and a
/// wrong password produce the same error.
pub fn login(repo: &dyn UserRepository, username: &str, password: &str) -> Result<User, AuthError> {
    tracing::debug!("Attempting to log in user: {}", username);
    let user = match repo.find(username) {
        Some(user) => user,
        None => {
            tracing::warn!("User not found: {}", username);
            return Err(AuthError::InvalidCredentials);
        }
    };
    if verify_password(&user.password_hash, password) {
        tracing::debug!(
            "Login successful for user: {} with account type: {}",
            username,
            user.account_type.as_str()
        );
        Ok(user)
    } else {
        tracing::warn!("Invalid credentials provided for user: {}", username);
        Err(AuthError::InvalidCredentials)
    }
}

const SALT_LEN: usize = 16;

/// Salted one-way hash, stored as `base64(salt)$base64(digest)`.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    format!(
        "{}${}",
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(digest(&salt, password))
    )
}

/// Check a password against a stored hash. Malformed stored values simply
/// fail verification.
pub fn verify_password(stored: &str, password: &str) -> bool {
    let Some((salt_b64, digest_b64)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = URL_SAFE_NO_PAD.decode(salt_b64) else {
        return false;
    };
    URL_SAFE_NO_PAD.encode(digest(&salt, password)) == digest_b64
}

fn digest(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let stored = hash_password("hunter2");
        assert!(verify_password(&stored, "hunter2"));
        assert!(!verify_password(&stored, "hunter3"));
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn test_malformed_stored_hash_fails_verification() {
        assert!(!verify_password("not-a-hash", "anything"));
        assert!(!verify_password("!!$!!", "anything"));
    }

    #[test]
    fn test_register_and_login() {
        let repo = MemoryUserRepo::default();
        register(&repo, "alice", "secret", AccountType::Admin).expect("register");

        let user = login(&repo, "alice", "secret").expect("login");
        assert_eq!(user.account_type, AccountType::Admin);

        assert_eq!(
            login(&repo, "alice", "wrong").unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            login(&repo, "nobody", "secret").unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[test]
    fn test_duplicate_registration_does_not_overwrite() {
        let repo = MemoryUserRepo::default();
        register(&repo, "bob", "first", AccountType::Standard).expect("register");

        let err = register(&repo, "bob", "second", AccountType::Admin).unwrap_err();
        assert_eq!(err, AuthError::UsernameTaken);

        // Original credentials and role survive.
        let user = login(&repo, "bob", "first").expect("login");
        assert_eq!(user.account_type, AccountType::Standard);
        assert!(login(&repo, "bob", "second").is_err());
    }

    #[test]
    fn test_account_type_parse() {
        assert_eq!(AccountType::parse("admin"), AccountType::Admin);
        assert_eq!(AccountType::parse("standard"), AccountType::Standard);
        assert_eq!(AccountType::parse("root"), AccountType::Standard);
    }
}
