//! Request-scoped access to the current session.

use crate::error::SessionResult;
use crate::traits::{Session, SessionStore, generate_token};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// What has happened to a session during the current request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Nothing to write back.
    Unmodified,
    /// Data or token changed, the session must be saved.
    Modified,
    /// The session must be deleted and its cookie cleared.
    Destroyed,
}

struct State {
    session: Session,
    status: SessionStatus,
    persisted: bool,
}

/// Handle to the session of the request being processed.
///
/// Cloning is cheap and every clone sees the same session. Handles are owned
/// by a single request and never shared across requests; the store is the only
/// state shared between requests.
#[derive(Clone)]
pub struct SessionHandle {
    state: Arc<Mutex<State>>,
    store: Arc<dyn SessionStore>,
}

impl SessionHandle {
    /// Wrap a session that was loaded from `store`.
    pub fn loaded(session: Session, store: Arc<dyn SessionStore>) -> Self {
        Self::with_state(session, true, store)
    }

    /// Wrap a brand new session that the store has not seen yet.
    pub fn fresh(session: Session, store: Arc<dyn SessionStore>) -> Self {
        Self::with_state(session, false, store)
    }

    fn with_state(session: Session, persisted: bool, store: Arc<dyn SessionStore>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                session,
                status: SessionStatus::Unmodified,
                persisted,
            })),
            store,
        }
    }

    /// Current session token.
    pub fn token(&self) -> String {
        self.state.lock().session.token.clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.state.lock().status
    }

    /// True until the session has been written to the store once.
    pub fn is_new(&self) -> bool {
        !self.state.lock().persisted
    }

    /// Seconds until the session expires.
    pub fn remaining_secs(&self) -> i64 {
        self.state.lock().session.remaining_secs()
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.state.lock().session.get(key)
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().session.contains(key)
    }

    /// Store a value and mark the session modified.
    pub fn put<T: Serialize>(&self, key: &str, value: T) -> SessionResult<()> {
        let mut state = self.state.lock();
        state.session.set(key, value)?;
        state.status = SessionStatus::Modified;
        Ok(())
    }

    /// Remove a value. The session is only marked modified if the key existed.
    pub fn remove(&self, key: &str) -> Option<serde_json::Value> {
        let mut state = self.state.lock();
        let removed = state.session.remove(key);
        if removed.is_some() {
            state.status = SessionStatus::Modified;
        }
        removed
    }

    /// Read a one-shot value and clear it.
    pub fn pop<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.remove(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    pub fn pop_string(&self, key: &str) -> Option<String> {
        self.pop(key)
    }

    /// Issue a new token for this session, keeping its data.
    ///
    /// A session already in the store is migrated by the store in one step,
    /// so the old token stops working before this returns.
    pub async fn renew(&self) -> SessionResult<String> {
        let (old_token, persisted) = {
            let state = self.state.lock();
            (state.session.token.clone(), state.persisted)
        };

        let new_token = if persisted {
            self.store.renew(&old_token).await?
        } else {
            generate_token()
        };

        let mut state = self.state.lock();
        state.session.token = new_token.clone();
        state.status = SessionStatus::Modified;

        tracing::debug!("session renewed");
        Ok(new_token)
    }

    /// Drop all data and mark the session for deletion.
    pub fn destroy(&self) {
        let mut state = self.state.lock();
        state.session.clear();
        state.status = SessionStatus::Destroyed;
    }

    /// Write pending changes to the store and report what was done.
    pub async fn commit(&self) -> SessionResult<SessionStatus> {
        let (session, status) = {
            let state = self.state.lock();
            (state.session.clone(), state.status)
        };

        match status {
            SessionStatus::Unmodified => {}
            SessionStatus::Modified => {
                self.store.save(&session).await?;
                let mut state = self.state.lock();
                state.persisted = true;
                state.status = SessionStatus::Unmodified;
            }
            SessionStatus::Destroyed => {
                self.store.delete(&session.token).await?;
                self.state.lock().persisted = false;
            }
        }

        Ok(status)
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SessionHandle")
            .field("status", &state.status)
            .field("persisted", &state.persisted)
            .field("keys", &state.session.data.keys().collect::<Vec<_>>())
            .finish()
    }
}
