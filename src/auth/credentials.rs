// Typed credential access over a key-value store

use std::sync::Arc;

use crate::models::User;
use crate::store::{KeyValueStore, StoreError};

use super::types::LoginResponse;

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_KEY: &str = "user";

/// Every key that makes up a session. Cleared together, never one at a time.
pub const SESSION_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY];

/// Session credentials backed by a shared [`KeyValueStore`]
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn access_token(&self) -> Result<Option<String>, StoreError> {
        self.store.get(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Result<Option<String>, StoreError> {
        self.store.get(REFRESH_TOKEN_KEY)
    }

    /// Cached user from the last login.
    /// Not authoritative; a record that fails to decode is treated as absent.
    pub fn cached_user(&self) -> Result<Option<User>, StoreError> {
        let Some(raw) = self.store.get(USER_KEY)? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(user) => Ok(Some(user)),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable cached user record");
                Ok(None)
            }
        }
    }

    /// Replace the cached user record
    pub fn cache_user(&self, user: &User) -> Result<(), StoreError> {
        let raw = serde_json::to_string(user)?;
        self.store.set(USER_KEY, &raw)
    }

    /// True when none of the session entries is stored
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        for key in SESSION_KEYS {
            if self.store.get(key)?.is_some() {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Persist a fresh login: both tokens and the user in one write
    pub fn save_session(&self, login: &LoginResponse) -> Result<(), StoreError> {
        let user = serde_json::to_string(&login.user)?;
        self.store.set_many(&[
            (ACCESS_TOKEN_KEY, login.access_token.as_str()),
            (REFRESH_TOKEN_KEY, login.refresh_token.as_str()),
            (USER_KEY, user.as_str()),
        ])
    }

    /// Overwrite the access token after a successful refresh
    pub fn set_access_token(&self, token: &str) -> Result<(), StoreError> {
        self.store.set(ACCESS_TOKEN_KEY, token)
    }

    /// Remove every session entry in one write
    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.remove_many(&SESSION_KEYS)
    }
}
