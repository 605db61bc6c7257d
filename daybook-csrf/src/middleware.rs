use crate::{config::CsrfConfig, error::CsrfError, token::CsrfToken};
use async_trait::async_trait;
use daybook_core::{
    Error, HttpRequest, HttpResponse, Middleware, Next, RequestContext, parse_form_map,
};
use daybook_session::{SessionHandle, SessionStatus};
use std::sync::Arc;
use tracing::{debug, warn};

/// CSRF protection middleware
///
/// Runs after the session stage. Every request gets a masked token in its
/// context for rendering; requests with unsafe methods must send the token
/// back in a header or form field or they are rejected with 400 before any
/// later stage runs. When the inner stages renew the session, the token is
/// replaced too.
#[derive(Clone)]
pub struct CsrfMiddleware {
    config: Arc<CsrfConfig>,
}

impl CsrfMiddleware {
    /// Create new CSRF middleware
    pub fn new(config: CsrfConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Check if request needs CSRF protection. Safe methods never do.
    pub fn needs_protection(&self, request: &HttpRequest) -> bool {
        if request.http_method().is_some_and(|method| method.is_safe()) {
            return false;
        }

        !self
            .config
            .exclude_paths
            .iter()
            .any(|excluded| request.path.starts_with(excluded.as_str()))
    }

    /// The session's token, created on first use.
    pub fn session_token(&self, session: &SessionHandle) -> Result<CsrfToken, CsrfError> {
        if let Some(stored) = session.get_string(&self.config.session_key) {
            match CsrfToken::decode(&stored) {
                Ok(token) => return Ok(token),
                Err(_) => debug!("replacing malformed CSRF token in session"),
            }
        }

        let token = CsrfToken::generate();
        session.put(&self.config.session_key, token.encode())?;
        Ok(token)
    }

    /// Validate CSRF token from request
    pub fn validate_request(
        &self,
        request: &HttpRequest,
        token: &CsrfToken,
    ) -> Result<(), CsrfError> {
        if !self.needs_protection(request) {
            return Ok(());
        }

        let submitted = self
            .token_from_header(request)
            .or_else(|| self.token_from_body(request))
            .ok_or(CsrfError::MissingToken)?;

        if token.verify(&submitted) {
            Ok(())
        } else {
            Err(CsrfError::InvalidToken)
        }
    }

    fn token_from_header(&self, request: &HttpRequest) -> Option<String> {
        request
            .header(&self.config.header_name)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    fn token_from_body(&self, request: &HttpRequest) -> Option<String> {
        let is_form = request
            .header("content-type")
            .is_none_or(|ct| ct.starts_with("application/x-www-form-urlencoded"));
        if !is_form {
            return None;
        }

        parse_form_map(&request.body)
            .ok()?
            .remove(&self.config.field_name)
    }
}

#[async_trait]
impl Middleware for CsrfMiddleware {
    async fn handle(
        &self,
        req: HttpRequest,
        mut ctx: RequestContext,
        next: Next,
    ) -> Result<HttpResponse, Error> {
        let session = ctx.require_session()?.clone();
        let token = self.session_token(&session)?;

        if let Err(err) = self.validate_request(&req, &token) {
            warn!(
                method = %req.method,
                uri = %req.uri(),
                reason = %err,
                "rejected request failing CSRF check"
            );
            return Err(err.into());
        }

        ctx.set_csrf_token(token.masked());

        let session_token = session.token();
        let response = next(req, ctx).await?;

        if session.token() != session_token && session.status() != SessionStatus::Destroyed {
            debug!("session renewed, issuing a new CSRF token");
            session.put(&self.config.session_key, CsrfToken::generate().encode())?;
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daybook_session::{MemorySessionStore, Session, generate_token};
    use std::time::Duration;

    fn session() -> SessionHandle {
        SessionHandle::fresh(
            Session::new(generate_token(), Duration::from_secs(60)),
            Arc::new(MemorySessionStore::new()),
        )
    }

    #[test]
    fn test_safe_methods() {
        let middleware = CsrfMiddleware::new(CsrfConfig::default());

        for method in ["GET", "HEAD", "OPTIONS", "TRACE"] {
            let req = HttpRequest::new(method.to_string(), "/test".to_string());
            assert!(!middleware.needs_protection(&req), "{} is safe", method);
        }

        let post_req = HttpRequest::new("POST".to_string(), "/test".to_string());
        assert!(middleware.needs_protection(&post_req));

        let odd_req = HttpRequest::new("PURGE".to_string(), "/test".to_string());
        assert!(middleware.needs_protection(&odd_req));
    }

    #[test]
    fn test_excluded_paths() {
        let config = CsrfConfig::default().with_exclude_paths(vec!["/webhooks".to_string()]);
        let middleware = CsrfMiddleware::new(config);

        let excluded_req = HttpRequest::new("POST".to_string(), "/webhooks/stripe".to_string());
        assert!(!middleware.needs_protection(&excluded_req));

        let protected_req = HttpRequest::new("POST".to_string(), "/days/create".to_string());
        assert!(middleware.needs_protection(&protected_req));
    }

    #[test]
    fn test_session_token_is_stable() {
        let middleware = CsrfMiddleware::new(CsrfConfig::default());
        let session = session();

        let first = middleware.session_token(&session).unwrap();
        let second = middleware.session_token(&session).unwrap();
        assert_eq!(first, second);
        assert!(session.contains("csrf_token"));
    }

    #[test]
    fn test_malformed_stored_token_is_replaced() {
        let middleware = CsrfMiddleware::new(CsrfConfig::default());
        let session = session();
        session.put("csrf_token", "garbage").unwrap();

        let token = middleware.session_token(&session).unwrap();
        assert_eq!(session.get_string("csrf_token"), Some(token.encode()));
    }

    #[test]
    fn test_validate_from_header_and_form() {
        let middleware = CsrfMiddleware::new(CsrfConfig::default());
        let token = CsrfToken::generate();

        let req = HttpRequest::new("POST".to_string(), "/days/create".to_string())
            .with_header("x-csrf-token", token.masked());
        assert!(middleware.validate_request(&req, &token).is_ok());

        let req = HttpRequest::new("POST".to_string(), "/days/create".to_string())
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_body(format!("calories=10&csrf_token={}", token.masked()));
        assert!(middleware.validate_request(&req, &token).is_ok());
    }

    #[test]
    fn test_validate_rejections() {
        let middleware = CsrfMiddleware::new(CsrfConfig::default());
        let token = CsrfToken::generate();

        let req = HttpRequest::new("POST".to_string(), "/days/create".to_string());
        assert!(matches!(
            middleware.validate_request(&req, &token),
            Err(CsrfError::MissingToken)
        ));

        let req = HttpRequest::new("POST".to_string(), "/days/create".to_string())
            .with_body(format!("csrf_token={}", CsrfToken::generate().masked()));
        assert!(matches!(
            middleware.validate_request(&req, &token),
            Err(CsrfError::InvalidToken)
        ));

        let req = HttpRequest::new("POST".to_string(), "/days/create".to_string())
            .with_header("Content-Type", "application/json")
            .with_body(format!("{{\"csrf_token\":\"{}\"}}", token.masked()));
        assert!(matches!(
            middleware.validate_request(&req, &token),
            Err(CsrfError::MissingToken)
        ));
    }
}
