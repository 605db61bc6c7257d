// Session load-and-save stage

use crate::logging::debug;
use crate::middleware::{Middleware, Next};
use crate::{Error, HttpRequest, HttpResponse, RequestContext};
use async_trait::async_trait;
use daybook_session::{
    Session, SessionConfig, SessionHandle, SessionStatus, SessionStore, generate_token,
};
use std::sync::Arc;

/// Loads the session named by the request cookie before the inner stages run
/// and writes it back afterwards.
///
/// Requests without a usable cookie get a fresh, unsaved session. A session is
/// only written, and the cookie only sent, when something changed it.
pub struct SessionMiddleware {
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
}

impl SessionMiddleware {
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    async fn load(&self, req: &HttpRequest) -> Result<SessionHandle, Error> {
        let token = req
            .cookie(&self.config.cookie_name)
            .filter(|token| !token.is_empty());

        if let Some(token) = token {
            if let Some(session) = self.store.load(&token).await? {
                return Ok(SessionHandle::loaded(session, self.store.clone()));
            }
            debug!("session cookie did not match a live session");
        }

        let session = Session::new(generate_token(), self.config.lifetime);
        Ok(SessionHandle::fresh(session, self.store.clone()))
    }
}

#[async_trait]
impl Middleware for SessionMiddleware {
    async fn handle(
        &self,
        req: HttpRequest,
        ctx: RequestContext,
        next: Next,
    ) -> Result<HttpResponse, Error> {
        let session = self.load(&req).await?;

        let mut response = next(req, ctx.with_session(session.clone())).await?;

        let cookie = match session.commit().await? {
            SessionStatus::Modified => Some(
                self.config
                    .cookie(&session.token(), session.remaining_secs()),
            ),
            SessionStatus::Destroyed => Some(self.config.removal_cookie()),
            SessionStatus::Unmodified => None,
        };

        if let Some(cookie) = cookie {
            response.headers.insert("Set-Cookie".to_string(), cookie);
            // Shared caches must not store a response that sets a cookie.
            response
                .headers
                .entry("Cache-Control".to_string())
                .or_insert_with(|| "no-cache=\"Set-Cookie\"".to_string());
        }

        response
            .headers
            .insert("Vary".to_string(), "Cookie".to_string());

        Ok(response)
    }
}
