// Per-request processing context

use crate::Error;
use daybook_session::SessionHandle;
use serde::Serialize;

/// Who is making the request, as decided once per request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AuthContext {
    pub authenticated: bool,
    pub user_id: Option<i64>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(user_id: i64) -> Self {
        Self {
            authenticated: true,
            user_id: Some(user_id),
        }
    }
}

/// State threaded through every pipeline stage alongside the request.
///
/// Stages receive it by value and forward an augmented copy: the session
/// stage adds the session, the CSRF stage adds the token to render, the
/// authentication stage adds the [`AuthContext`].
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    session: Option<SessionHandle>,
    auth: Option<AuthContext>,
    csrf_token: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(mut self, session: SessionHandle) -> Self {
        self.session = Some(session);
        self
    }

    pub fn session(&self) -> Option<&SessionHandle> {
        self.session.as_ref()
    }

    /// The session, for stages that cannot run without one.
    pub fn require_session(&self) -> Result<&SessionHandle, Error> {
        self.session
            .as_ref()
            .ok_or_else(|| Error::Internal("no session stage ahead of this one".to_string()))
    }

    /// Attach the authentication result. Allowed once per request.
    pub fn attach_auth(&mut self, auth: AuthContext) -> Result<(), Error> {
        if self.auth.is_some() {
            return Err(Error::Internal(
                "authentication context attached twice".to_string(),
            ));
        }
        self.auth = Some(auth);
        Ok(())
    }

    /// The attached authentication result, if the resolver has run.
    pub fn auth(&self) -> Option<AuthContext> {
        self.auth
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_some_and(|auth| auth.authenticated)
    }

    pub fn user_id(&self) -> Option<i64> {
        self.auth.and_then(|auth| auth.user_id)
    }

    pub fn set_csrf_token(&mut self, token: impl Into<String>) {
        self.csrf_token = Some(token.into());
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }
}
