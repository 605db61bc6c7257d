// Authentication resolver and route gate

use crate::store::IdentityStore;
use crate::session::{remember_destination, user_id};
use async_trait::async_trait;
use daybook_core::{AuthContext, Error, HttpRequest, HttpResponse, Middleware, Next, RequestContext};
use std::sync::Arc;
use tracing::{debug, warn};

/// Decides once per request who is asking and attaches the answer to the
/// context.
///
/// A session marker only counts if the identity store still knows the user.
/// When the store cannot be asked, the request continues as anonymous and the
/// session is left as it is.
pub struct Authenticate {
    store: Arc<dyn IdentityStore>,
}

impl Authenticate {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    async fn resolve(&self, ctx: &RequestContext) -> AuthContext {
        let Some(id) = ctx.session().and_then(user_id) else {
            return AuthContext::anonymous();
        };

        match self.store.exists(id).await {
            Ok(true) => AuthContext::user(id),
            Ok(false) => {
                debug!(user_id = id, "session refers to a user that no longer exists");
                AuthContext::anonymous()
            }
            Err(err) => {
                warn!(user_id = id, error = %err, "identity check failed, treating request as anonymous");
                AuthContext::anonymous()
            }
        }
    }
}

#[async_trait]
impl Middleware for Authenticate {
    async fn handle(
        &self,
        req: HttpRequest,
        mut ctx: RequestContext,
        next: Next,
    ) -> Result<HttpResponse, Error> {
        let auth = self.resolve(&ctx).await;
        ctx.attach_auth(auth)?;
        next(req, ctx).await
    }
}

/// Gate for protected routes. Must come after [`Authenticate`].
///
/// Anonymous requests are sent to the sign-in page with their URI remembered.
/// Pages served to signed-in users are marked uncacheable.
pub struct RequireAuthentication {
    login_path: String,
}

impl RequireAuthentication {
    pub fn new() -> Self {
        Self {
            login_path: "/users/login".to_string(),
        }
    }

    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }
}

impl Default for RequireAuthentication {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for RequireAuthentication {
    async fn handle(
        &self,
        req: HttpRequest,
        ctx: RequestContext,
        next: Next,
    ) -> Result<HttpResponse, Error> {
        let auth = ctx.auth().ok_or_else(|| {
            Error::Internal("authorization gate runs before authentication".to_string())
        })?;

        if !auth.authenticated {
            remember_destination(ctx.require_session()?, &req.uri())?;
            debug!(uri = %req.uri(), "redirecting anonymous request to sign-in");
            return Ok(HttpResponse::see_other(self.login_path.as_str()));
        }

        let response = next(req, ctx).await?;
        Ok(response.with_header("Cache-Control", "no-store"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AuthError, Result as AuthResult};
    use daybook_session::{
        AUTH_USER_KEY, MemorySessionStore, REDIRECT_AFTER_LOGIN_KEY, Session, SessionHandle,
        generate_token,
    };
    use std::time::Duration;

    struct FixedStore(AuthResult<bool>);

    #[async_trait]
    impl IdentityStore for FixedStore {
        async fn authenticate(&self, _email: &str, _password: &str) -> AuthResult<i64> {
            Err(AuthError::InvalidCredentials)
        }

        async fn exists(&self, _id: i64) -> AuthResult<bool> {
            match &self.0 {
                Ok(found) => Ok(*found),
                Err(err) => Err(AuthError::Store(err.to_string())),
            }
        }
    }

    fn signed_in_ctx(id: Option<i64>) -> RequestContext {
        let session = SessionHandle::fresh(
            Session::new(generate_token(), Duration::from_secs(60)),
            Arc::new(MemorySessionStore::new()),
        );
        if let Some(id) = id {
            session.put(AUTH_USER_KEY, id).unwrap();
        }
        RequestContext::new().with_session(session)
    }

    fn echo_auth() -> Next {
        Box::new(|_req, ctx| {
            Box::pin(async move {
                let body = format!("{:?}", ctx.user_id());
                Ok(HttpResponse::ok().with_text(body))
            })
        })
    }

    fn request(uri: &str) -> HttpRequest {
        HttpRequest::new("GET".to_string(), uri.to_string())
    }

    #[tokio::test]
    async fn test_resolves_existing_user() {
        let mw = Authenticate::new(Arc::new(FixedStore(Ok(true))));
        let response = mw
            .handle(request("/"), signed_in_ctx(Some(3)), echo_auth())
            .await
            .unwrap();
        assert_eq!(response.body, b"Some(3)");
    }

    #[tokio::test]
    async fn test_deleted_user_is_anonymous() {
        let mw = Authenticate::new(Arc::new(FixedStore(Ok(false))));
        let response = mw
            .handle(request("/"), signed_in_ctx(Some(3)), echo_auth())
            .await
            .unwrap();
        assert_eq!(response.body, b"None");
    }

    #[tokio::test]
    async fn test_store_failure_fails_open_without_touching_session() {
        let mw = Authenticate::new(Arc::new(FixedStore(Err(AuthError::Store("down".into())))));
        let ctx = signed_in_ctx(Some(3));
        let session = ctx.session().unwrap().clone();
        let status_before = session.status();

        let response = mw.handle(request("/"), ctx, echo_auth()).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"None");
        assert_eq!(session.get_i64(AUTH_USER_KEY), Some(3));
        assert_eq!(session.status(), status_before);
    }

    #[tokio::test]
    async fn test_no_session_is_anonymous() {
        let mw = Authenticate::new(Arc::new(FixedStore(Ok(true))));
        let response = mw
            .handle(request("/"), RequestContext::new(), echo_auth())
            .await
            .unwrap();
        assert_eq!(response.body, b"None");
    }

    #[tokio::test]
    async fn test_resolver_attaches_once() {
        let mw = Authenticate::new(Arc::new(FixedStore(Ok(true))));
        let mut ctx = signed_in_ctx(Some(3));
        ctx.attach_auth(AuthContext::anonymous()).unwrap();

        let err = mw.handle(request("/"), ctx, echo_auth()).await.unwrap_err();
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_gate_redirects_anonymous_and_remembers_uri() {
        let gate = RequireAuthentication::new();
        let mut ctx = signed_in_ctx(None);
        ctx.attach_auth(AuthContext::anonymous()).unwrap();
        let session = ctx.session().unwrap().clone();

        let response = gate
            .handle(request("/days/view/4?tab=macros"), ctx, echo_auth())
            .await
            .unwrap();

        assert_eq!(response.status, 303);
        assert_eq!(response.header("location"), Some("/users/login"));
        assert_eq!(
            session.get_string(REDIRECT_AFTER_LOGIN_KEY),
            Some("/days/view/4?tab=macros".to_string())
        );
    }

    #[tokio::test]
    async fn test_gate_forwards_authenticated() {
        let gate = RequireAuthentication::new().with_login_path("/signin");
        let mut ctx = signed_in_ctx(Some(1));
        ctx.attach_auth(AuthContext::user(1)).unwrap();

        let response = gate.handle(request("/"), ctx, echo_auth()).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.header("cache-control"), Some("no-store"));
    }

    #[tokio::test]
    async fn test_gate_without_resolver_is_internal_error() {
        let gate = RequireAuthentication::new();
        let err = gate
            .handle(request("/"), signed_in_ctx(Some(1)), echo_auth())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 500);
    }
}
