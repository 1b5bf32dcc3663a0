//! Authentication & Sessions
//!
//! Username/password accounts with salted SHA-256 digests and opaque bearer
//! tokens held in memory. Role checks (farmer vs admin) happen at the
//! handler level; this module only answers "who is this token".

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use rand::distributions::Alphanumeric;
use rand::Rng;
use rustc_hash::FxHashMap;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::models::{Id, Role, User};

const TOKEN_LEN: usize = 40;
const SALT_LEN: usize = 16;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("username `{0}` is already taken")]
    DuplicateUsername(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("username and password must not be empty")]
    EmptyCredentials,
}

struct Account {
    user: User,
    salt: String,
    digest: String,
}

#[derive(Default)]
struct AuthTables {
    next_id: Id,
    accounts: FxHashMap<Id, Account>,
    by_username: FxHashMap<String, Id>,
    sessions: FxHashMap<String, Id>,
}

/// In-memory account and session registry.
#[derive(Default)]
pub struct Authenticator {
    tables: RwLock<AuthTables>,
}

impl Authenticator {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, AuthTables> {
        self.tables.read().expect("auth lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, AuthTables> {
        self.tables.write().expect("auth lock poisoned")
    }

    /// Create an account. Usernames are unique (case-insensitive).
    pub fn register(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<User, AuthError> {
        if username.trim().is_empty() || password.is_empty() {
            return Err(AuthError::EmptyCredentials);
        }
        let key = username.to_lowercase();
        let mut tables = self.write();
        if tables.by_username.contains_key(&key) {
            return Err(AuthError::DuplicateUsername(username.to_string()));
        }
        tables.next_id += 1;
        let id = tables.next_id;
        let salt = random_string(SALT_LEN);
        let user = User {
            id,
            username: username.to_string(),
            role,
        };
        tables.accounts.insert(
            id,
            Account {
                user: user.clone(),
                digest: hash_password(&salt, password),
                salt,
            },
        );
        tables.by_username.insert(key, id);
        Ok(user)
    }

    /// Verify credentials and open a session, returning the bearer token.
    pub fn login(&self, username: &str, password: &str) -> Result<(String, User), AuthError> {
        let key = username.to_lowercase();
        let mut tables = self.write();
        let id = *tables
            .by_username
            .get(&key)
            .ok_or(AuthError::InvalidCredentials)?;
        let account = tables
            .accounts
            .get(&id)
            .ok_or(AuthError::InvalidCredentials)?;
        if hash_password(&account.salt, password) != account.digest {
            return Err(AuthError::InvalidCredentials);
        }
        let user = account.user.clone();
        let token = random_string(TOKEN_LEN);
        tables.sessions.insert(token.clone(), id);
        Ok((token, user))
    }

    /// Resolve a bearer token to its user, if the session is live.
    pub fn authenticate(&self, token: &str) -> Option<User> {
        let tables = self.read();
        let id = tables.sessions.get(token)?;
        tables.accounts.get(id).map(|a| a.user.clone())
    }

    pub fn logout(&self, token: &str) -> bool {
        let mut tables = self.write();
        tables.sessions.remove(token).is_some()
    }
}

fn hash_password(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_login_authenticate_round_trip() {
        let auth = Authenticator::new();
        let user = auth.register("maria", "s3cret", Role::Farmer).unwrap();
        assert_eq!(user.role, Role::Farmer);

        let (token, logged_in) = auth.login("maria", "s3cret").unwrap();
        assert_eq!(logged_in.id, user.id);

        let resolved = auth.authenticate(&token).unwrap();
        assert_eq!(resolved.username, "maria");
    }

    #[test]
    fn wrong_password_is_rejected() {
        let auth = Authenticator::new();
        auth.register("maria", "s3cret", Role::Farmer).unwrap();
        assert_eq!(
            auth.login("maria", "nope").unwrap_err(),
            AuthError::InvalidCredentials
        );
    }

    #[test]
    fn usernames_unique_case_insensitive() {
        let auth = Authenticator::new();
        auth.register("Maria", "a", Role::Farmer).unwrap();
        assert!(matches!(
            auth.register("maria", "b", Role::Admin).unwrap_err(),
            AuthError::DuplicateUsername(_)
        ));
    }

    #[test]
    fn logout_invalidates_the_token() {
        let auth = Authenticator::new();
        auth.register("maria", "s3cret", Role::Farmer).unwrap();
        let (token, _) = auth.login("maria", "s3cret").unwrap();

        assert!(auth.logout(&token));
        assert!(auth.authenticate(&token).is_none());
    }

    #[test]
    fn empty_credentials_rejected() {
        let auth = Authenticator::new();
        assert_eq!(
            auth.register(" ", "pw", Role::Farmer).unwrap_err(),
            AuthError::EmptyCredentials
        );
        assert_eq!(
            auth.register("maria", "", Role::Farmer).unwrap_err(),
            AuthError::EmptyCredentials
        );
    }
}
