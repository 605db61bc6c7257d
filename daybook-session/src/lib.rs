//! Server-side sessions for Daybook.
//!
//! A session is a small key-value record stored server side and named by an
//! opaque, unguessable token. The token travels in an HTTP-only cookie; the
//! data never leaves the server.
//!
//! # Features
//!
//! - `redis` - Redis session storage
//!
//! # Examples
//!
//! ```
//! use daybook_session::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), SessionError> {
//! let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
//! let session = Session::new(generate_token(), Duration::from_secs(3600));
//!
//! let handle = SessionHandle::fresh(session, store.clone());
//! handle.put("flash", "Welcome back")?;
//! handle.commit().await?;
//!
//! // Rotate the token after a privilege change.
//! let old = handle.token();
//! let new = handle.renew().await?;
//! assert!(store.load(&old).await?.is_none());
//! assert!(store.load(&new).await?.is_some());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod handle;
pub mod memory_session;
pub mod traits;

#[cfg(feature = "redis")]
pub mod redis_session;

pub use config::{SameSite, SessionConfig};
pub use error::{SessionError, SessionResult};
pub use handle::{SessionHandle, SessionStatus};
pub use memory_session::MemorySessionStore;
pub use traits::{Session, SessionStore, generate_token};

#[cfg(feature = "redis")]
pub use redis_session::RedisSessionStore;

/// Session key holding the authenticated user's id.
pub const AUTH_USER_KEY: &str = "authenticatedUserID";

/// Session key holding a one-shot message shown on the next page.
pub const FLASH_KEY: &str = "flash";

/// Session key holding the path to return to after signing in.
pub const REDIRECT_AFTER_LOGIN_KEY: &str = "redirectPathAfterLogin";

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{SameSite, SessionConfig};
    pub use crate::error::{SessionError, SessionResult};
    pub use crate::handle::{SessionHandle, SessionStatus};
    pub use crate::memory_session::MemorySessionStore;
    pub use crate::traits::{Session, SessionStore, generate_token};
    pub use crate::{AUTH_USER_KEY, FLASH_KEY, REDIRECT_AFTER_LOGIN_KEY};

    #[cfg(feature = "redis")]
    pub use crate::redis_session::RedisSessionStore;
}
