// LogDepot - app/users.rs
//
// Credential store backing /register and /login.
//
// Passwords are stored as Argon2id PHC strings (algorithm, parameters, salt
// and digest in one field); the plain password never leaves
// `register`/`verify`. The store is persisted to `users.json` with the same
// atomic snapshot helper as the rest of the data directory. A file that
// cannot be decoded is moved aside before an empty store takes its place.

use crate::platform::fs::{load_json, quarantine, save_json_atomic, Snapshot};
use crate::util::constants;
use crate::util::error::AuthError;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// One stored credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct UserRecord {
    /// PHC string, e.g. `$argon2id$v=19$m=19456,t=2,p=1$<salt>$<hash>`.
    password_hash: String,
}

#[derive(Serialize, Deserialize)]
struct UsersSnapshot {
    version: u32,
    #[serde(default)]
    users: BTreeMap<String, UserRecord>,
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::encode_b64(uuid::Uuid::new_v4().as_bytes())
        .map_err(|source| AuthError::PasswordHash { source })?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|source| AuthError::PasswordHash { source })
}

/// Constant-time check of `password` against a stored PHC string.
fn password_matches(stored: &str, password: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Stored password hash is unreadable");
            false
        }
    }
}

/// Username/password store.
#[derive(Debug)]
pub struct UserStore {
    users: RwLock<BTreeMap<String, UserRecord>>,
    persist_path: Option<PathBuf>,
}

impl UserStore {
    pub fn in_memory() -> Self {
        Self {
            users: RwLock::new(BTreeMap::new()),
            persist_path: None,
        }
    }

    /// Open the store persisted at `path`.
    ///
    /// A missing file starts an empty store. A file that does not decode, or
    /// was written by another schema version, is moved aside first. A file
    /// that cannot be read at all is an error.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AuthError> {
        let path = path.into();
        let users = match load_json::<UsersSnapshot>(&path)? {
            Snapshot::Loaded(snapshot) if snapshot.version == constants::USERS_VERSION => {
                tracing::debug!(users = snapshot.users.len(), "User store restored");
                snapshot.users
            }
            Snapshot::Loaded(snapshot) => {
                tracing::warn!(
                    path = %path.display(),
                    found = snapshot.version,
                    expected = constants::USERS_VERSION,
                    "User store version mismatch"
                );
                quarantine(&path)?;
                BTreeMap::new()
            }
            Snapshot::Malformed(e) => {
                tracing::warn!(path = %path.display(), error = %e, "User store does not decode");
                quarantine(&path)?;
                BTreeMap::new()
            }
            Snapshot::Missing => BTreeMap::new(),
        };
        Ok(Self {
            users: RwLock::new(users),
            persist_path: Some(path),
        })
    }

    /// Add a new user. Usernames are unique and case-sensitive.
    pub fn register(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AuthError::InvalidInput {
                reason: "Username and password are required".to_string(),
            });
        }
        if username.len() > constants::MAX_USERNAME_LEN {
            return Err(AuthError::InvalidInput {
                reason: format!(
                    "Username must be at most {} characters",
                    constants::MAX_USERNAME_LEN
                ),
            });
        }

        // Hash before taking the lock.
        let record = UserRecord {
            password_hash: hash_password(password)?,
        };

        let mut users = self.users.write();
        if users.contains_key(username) {
            return Err(AuthError::UsernameTaken {
                username: username.to_string(),
            });
        }

        if let Some(ref path) = self.persist_path {
            let mut next = users.clone();
            next.insert(username.to_string(), record.clone());
            let snapshot = UsersSnapshot {
                version: constants::USERS_VERSION,
                users: next,
            };
            save_json_atomic(&snapshot, path)?;
        }

        users.insert(username.to_string(), record);
        tracing::info!(username, "User registered");
        Ok(())
    }

    /// True when `username` exists and `password` matches.
    pub fn verify(&self, username: &str, password: &str) -> bool {
        let stored = match self.users.read().get(username) {
            Some(record) => record.password_hash.clone(),
            None => return false,
        };
        password_matches(&stored, password)
    }

    /// Check credentials, mapping a mismatch to `InvalidCredentials`.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<(), AuthError> {
        if self.verify(username, password) {
            Ok(())
        } else {
            tracing::debug!(username, "Rejected login");
            Err(AuthError::InvalidCredentials)
        }
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
