//! In-process session storage.

use crate::error::SessionResult;
use crate::traits::{Session, SessionStore, generate_token};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Session store backed by a process-local map.
///
/// Cloning shares the underlying map. Locks are only held for the duration
/// of a single map operation.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, token: &str) -> SessionResult<Option<Session>> {
        let session = self.sessions.read().get(token).cloned();

        match session {
            Some(session) if session.is_expired() => {
                self.sessions.write().remove(token);
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn save(&self, session: &Session) -> SessionResult<()> {
        if session.is_expired() {
            self.sessions.write().remove(&session.token);
            return Ok(());
        }

        self.sessions
            .write()
            .insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn renew(&self, old_token: &str) -> SessionResult<String> {
        let new_token = generate_token();

        let mut sessions = self.sessions.write();
        if let Some(mut session) = sessions.remove(old_token) {
            session.token = new_token.clone();
            sessions.insert(new_token.clone(), session);
        }

        Ok(new_token)
    }

    async fn delete(&self, token: &str) -> SessionResult<()> {
        self.sessions.write().remove(token);
        Ok(())
    }

    async fn count(&self) -> SessionResult<usize> {
        Ok(self.sessions.read().len())
    }

    async fn cleanup_expired(&self) -> SessionResult<usize> {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        Ok(before - sessions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn session(lifetime: u64) -> Session {
        Session::new(generate_token(), Duration::from_secs(lifetime))
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = MemorySessionStore::new();
        let mut session = session(60);
        session.set("flash", "saved").unwrap();
        store.save(&session).await.unwrap();

        let loaded = store.load(&session.token).await.unwrap().unwrap();
        assert_eq!(loaded.get::<String>("flash"), Some("saved".to_string()));
        assert_eq!(loaded.token, session.token);
    }

    #[tokio::test]
    async fn test_load_unknown_token() {
        let store = MemorySessionStore::new();
        assert!(store.load("missing").await.unwrap().is_none());
        assert!(!store.exists("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_not_loaded() {
        let store = MemorySessionStore::new();
        let mut expired = session(60);
        expired.expires_at = chrono::Utc::now() - chrono::Duration::seconds(1);
        store
            .sessions
            .write()
            .insert(expired.token.clone(), expired.clone());

        assert!(store.load(&expired.token).await.unwrap().is_none());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_renew_moves_data() {
        let store = MemorySessionStore::new();
        let mut session = session(60);
        session.set("authenticatedUserID", 7i64).unwrap();
        store.save(&session).await.unwrap();

        let new_token = store.renew(&session.token).await.unwrap();
        assert_ne!(new_token, session.token);
        assert!(store.load(&session.token).await.unwrap().is_none());

        let renewed = store.load(&new_token).await.unwrap().unwrap();
        assert_eq!(renewed.token, new_token);
        assert_eq!(renewed.get::<i64>("authenticatedUserID"), Some(7));
        assert_eq!(renewed.expires_at, session.expires_at);
    }

    #[tokio::test]
    async fn test_renew_unknown_token_issues_fresh_token() {
        let store = MemorySessionStore::new();
        let token = store.renew("never-saved").await.unwrap();
        assert!(!token.is_empty());
        assert!(store.load(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemorySessionStore::new();
        let session = session(60);
        store.save(&session).await.unwrap();
        store.delete(&session.token).await.unwrap();
        assert!(store.load(&session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let store = MemorySessionStore::new();
        store.save(&session(60)).await.unwrap();

        let mut stale = session(60);
        stale.expires_at = chrono::Utc::now() - chrono::Duration::seconds(5);
        store
            .sessions
            .write()
            .insert(stale.token.clone(), stale);

        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(store.cleanup_expired().await.unwrap(), 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_sessions_are_independent() {
        let store = MemorySessionStore::new();
        let mut handles = Vec::new();

        for i in 0..16i64 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let mut session = session(60);
                session.set("n", i).unwrap();
                store.save(&session).await.unwrap();
                let renewed = store.renew(&session.token).await.unwrap();
                store.load(&renewed).await.unwrap().unwrap().get::<i64>("n")
            }));
        }

        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), Some(i as i64));
        }
        assert_eq!(store.count().await.unwrap(), 16);
    }
}
