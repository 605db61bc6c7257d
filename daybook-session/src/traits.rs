//! Session data and the store trait.

use crate::error::{SessionError, SessionResult};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Number of random bytes in a session token.
pub const TOKEN_BYTES: usize = 32;

/// Session data structure.
///
/// The token is not part of the serialized payload: stores key records by
/// token and set it again on load, so a renamed record cannot carry a stale
/// token inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session token
    #[serde(skip)]
    pub token: String,
    /// Session data as key-value pairs
    pub data: HashMap<String, serde_json::Value>,
    /// Session creation timestamp
    pub created_at: DateTime<Utc>,
    /// Absolute expiration timestamp
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session with the given token and lifetime.
    pub fn new(token: impl Into<String>, lifetime: Duration) -> Self {
        let now = Utc::now();
        Self {
            token: token.into(),
            data: HashMap::new(),
            created_at: now,
            expires_at: now + chrono::Duration::from_std(lifetime).unwrap_or_default(),
        }
    }

    /// Check if the session has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Seconds until the session expires, zero once expired.
    pub fn remaining_secs(&self) -> i64 {
        (self.expires_at - Utc::now()).num_seconds().max(0)
    }

    /// Get a value from the session data.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Set a value in the session data.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> SessionResult<()> {
        let json_value =
            serde_json::to_value(value).map_err(|e| SessionError::Serialization(e.to_string()))?;
        self.data.insert(key.to_string(), json_value);
        Ok(())
    }

    /// Remove a value from the session data.
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.data.remove(key)
    }

    /// Check if a key exists in the session data.
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Clear all session data.
    pub fn clear(&mut self) {
        self.data.clear();
    }
}

/// Durable key-value storage for sessions, keyed by token.
///
/// Implementations must be safe to share between concurrently handled
/// requests. Operations on different tokens are independent.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load a session by token.
    ///
    /// Returns `Ok(None)` if the token is unknown or the session has expired.
    async fn load(&self, token: &str) -> SessionResult<Option<Session>>;

    /// Save a session under its token until its expiry.
    async fn save(&self, session: &Session) -> SessionResult<()>;

    /// Move the data stored under `old_token` to a freshly issued token.
    ///
    /// After this returns, loading `old_token` yields nothing. Unknown tokens
    /// still get a new token, with nothing migrated.
    async fn renew(&self, old_token: &str) -> SessionResult<String>;

    /// Delete a session.
    async fn delete(&self, token: &str) -> SessionResult<()>;

    /// Number of stored sessions, expired or not.
    async fn count(&self) -> SessionResult<usize>;

    /// Remove expired sessions, returning how many were dropped.
    async fn cleanup_expired(&self) -> SessionResult<usize>;

    /// Check if a live session exists for the token.
    async fn exists(&self, token: &str) -> SessionResult<bool> {
        Ok(self.load(token).await?.is_some())
    }
}

/// Generate a new session token: 256 random bits, URL-safe base64.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
