// Login and logout transitions of the session

use crate::Result;
use daybook_session::{AUTH_USER_KEY, REDIRECT_AFTER_LOGIN_KEY, SessionHandle};
use tracing::info;

/// Where a successful login goes when no destination was remembered.
pub const DEFAULT_LANDING: &str = "/days/create";

/// Sign the session in as `user_id` and return the path to redirect to.
///
/// The token is renewed before the identity marker is written. The
/// remembered destination, if any, is consumed.
pub async fn login(session: &SessionHandle, user_id: i64) -> Result<String> {
    session.renew().await?;
    session.put(AUTH_USER_KEY, user_id)?;

    let destination = session
        .pop_string(REDIRECT_AFTER_LOGIN_KEY)
        .filter(|path| is_local_path(path))
        .unwrap_or_else(|| DEFAULT_LANDING.to_string());

    info!(user_id, "user logged in");
    Ok(destination)
}

/// Sign the session out, renewing its token first.
pub async fn logout(session: &SessionHandle) -> Result<()> {
    session.renew().await?;
    if let Some(user_id) = session.remove(AUTH_USER_KEY) {
        info!(user_id = %user_id, "user logged out");
    }
    Ok(())
}

/// Remember where to send the user after they sign in.
pub fn remember_destination(session: &SessionHandle, path: &str) -> Result<()> {
    session.put(REDIRECT_AFTER_LOGIN_KEY, path)?;
    Ok(())
}

/// The id stored by [`login`], if the session is signed in.
pub fn user_id(session: &SessionHandle) -> Option<i64> {
    session.get_i64(AUTH_USER_KEY)
}

// "//host" and "/\host" are treated as other origins by browsers.
fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\")
}

#[cfg(test)]
mod tests {
    use super::*;
    use daybook_session::{FLASH_KEY, MemorySessionStore, Session, generate_token};
    use std::sync::Arc;
    use std::time::Duration;

    fn session() -> SessionHandle {
        SessionHandle::fresh(
            Session::new(generate_token(), Duration::from_secs(60)),
            Arc::new(MemorySessionStore::new()),
        )
    }

    #[test]
    fn test_login_renews_then_marks() {
        let session = session();
        session.put(FLASH_KEY, "Your signup was successful. Please log in.").unwrap();
        let before = session.token();

        let destination = tokio_test::block_on(login(&session, 7)).unwrap();

        assert_ne!(session.token(), before);
        assert_eq!(user_id(&session), Some(7));
        assert_eq!(destination, DEFAULT_LANDING);
        assert!(session.contains(FLASH_KEY));
    }

    #[tokio::test]
    async fn test_logout_renews_then_clears() {
        let session = session();
        login(&session, 7).await.unwrap();
        let before = session.token();

        logout(&session).await.unwrap();

        assert_ne!(session.token(), before);
        assert_eq!(user_id(&session), None);
    }

    #[tokio::test]
    async fn test_remembered_destination_used_once() {
        let session = session();
        remember_destination(&session, "/days/view/3").unwrap();

        assert_eq!(login(&session, 1).await.unwrap(), "/days/view/3");
        logout(&session).await.unwrap();
        assert_eq!(login(&session, 1).await.unwrap(), DEFAULT_LANDING);
    }

    #[tokio::test]
    async fn test_foreign_destination_ignored() {
        let session = session();
        remember_destination(&session, "//evil.example/days").unwrap();
        assert_eq!(login(&session, 1).await.unwrap(), DEFAULT_LANDING);
        assert!(!session.contains(REDIRECT_AFTER_LOGIN_KEY));
    }

    #[test]
    fn test_is_local_path() {
        assert!(is_local_path("/"));
        assert!(is_local_path("/days/create?x=1"));
        assert!(!is_local_path("https://example.com"));
        assert!(!is_local_path("//example.com"));
        assert!(!is_local_path("/\\example.com"));
    }
}
