//! Redis session storage implementation.

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::traits::{Session, SessionStore, generate_token};
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

/// Renames the old key only when it exists, so renewal is a single atomic step.
const RENEW_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
    redis.call('RENAME', KEYS[1], KEYS[2])
    return 1
end
return 0
"#;

/// Redis-backed session store.
///
/// ```no_run
/// use daybook_session::{RedisSessionStore, SessionConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SessionConfig::redis("redis://localhost:6379")?
///     .with_namespace("daybook:session");
/// let store = RedisSessionStore::new(config).await?;
/// # Ok(())
/// # }
/// ```
pub struct RedisSessionStore {
    conn: ConnectionManager,
    config: SessionConfig,
}

impl RedisSessionStore {
    /// Connect to the Redis server named in `config.url`.
    pub async fn new(config: SessionConfig) -> SessionResult<Self> {
        let url = config
            .url
            .clone()
            .ok_or_else(|| SessionError::InvalidUrl("missing Redis URL".to_string()))?;

        let client =
            redis::Client::open(url.as_str()).map_err(|e| SessionError::Connection(e.to_string()))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| SessionError::Connection(e.to_string()))?;

        Ok(Self { conn, config })
    }

    fn session_key(&self, token: &str) -> String {
        self.config.session_key(token)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, token: &str) -> SessionResult<Option<Session>> {
        let key = self.session_key(token);
        let mut conn = self.conn.clone();

        let data: Option<String> = conn.get(&key).await?;

        match data {
            Some(json) => {
                let mut session: Session = serde_json::from_str(&json)
                    .map_err(|e| SessionError::Deserialization(e.to_string()))?;
                session.token = token.to_string();

                if session.is_expired() {
                    self.delete(token).await?;
                    return Ok(None);
                }

                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, session: &Session) -> SessionResult<()> {
        let key = self.session_key(&session.token);
        let mut conn = self.conn.clone();

        let json = serde_json::to_string(session)
            .map_err(|e| SessionError::Serialization(e.to_string()))?;

        let remaining = session.remaining_secs() as u64;
        if remaining > 0 {
            let _: () = conn.set_ex(&key, json, remaining).await?;
        } else {
            let _: () = conn.del(&key).await?;
        }

        Ok(())
    }

    async fn renew(&self, old_token: &str) -> SessionResult<String> {
        let new_token = generate_token();
        let mut conn = self.conn.clone();

        let moved: i32 = redis::Script::new(RENEW_SCRIPT)
            .key(self.session_key(old_token))
            .key(self.session_key(&new_token))
            .invoke_async(&mut conn)
            .await?;

        tracing::debug!(moved = moved == 1, "session token renewed");
        Ok(new_token)
    }

    async fn delete(&self, token: &str) -> SessionResult<()> {
        let key = self.session_key(token);
        let mut conn = self.conn.clone();

        let _: () = conn.del(&key).await?;

        Ok(())
    }

    async fn count(&self) -> SessionResult<usize> {
        let mut conn = self.conn.clone();
        let pattern = format!("{}:*", self.config.namespace);

        let keys: Vec<String> = redis::cmd("KEYS")
            .arg(&pattern)
            .query_async(&mut conn)
            .await?;

        Ok(keys.len())
    }

    async fn cleanup_expired(&self) -> SessionResult<usize> {
        // Keys carry a TTL, Redis drops them on its own.
        Ok(0)
    }
}
