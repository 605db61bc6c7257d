// Middleware system for request/response processing

use crate::logging::{error, info, trace};
use crate::{Error, HttpRequest, HttpResponse, RequestContext};
use async_trait::async_trait;
use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

/// Future returned by handlers and by the rest of a middleware chain
pub type HandlerFuture = Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>;

/// Type alias for the next handler in the middleware chain
pub type Next = Box<dyn FnOnce(HttpRequest, RequestContext) -> HandlerFuture + Send>;

/// Type alias for handler functions
pub type HandlerFn = Arc<dyn Fn(HttpRequest, RequestContext) -> HandlerFuture + Send + Sync>;

/// Wrap an async function or closure as a [`HandlerFn`].
pub fn handler<F, Fut>(f: F) -> HandlerFn
where
    F: Fn(HttpRequest, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    Arc::new(move |req: HttpRequest, ctx: RequestContext| -> HandlerFuture {
        Box::pin(f(req, ctx))
    })
}

/// A pipeline stage.
///
/// A stage either answers the request itself or calls `next`, possibly with
/// an augmented context, and may post-process the response it gets back.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(
        &self,
        req: HttpRequest,
        ctx: RequestContext,
        next: Next,
    ) -> Result<HttpResponse, Error>;
}

/// Ordered list of stages. The first stage added is the outermost: it sees
/// the request first and the response last.
#[derive(Clone)]
pub struct MiddlewareChain {
    middlewares: Arc<Vec<Arc<dyn Middleware>>>,
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self {
            middlewares: Arc::new(Vec::new()),
        }
    }

    /// Add a middleware to the chain
    pub fn use_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        self.push(Arc::new(middleware));
    }

    /// Add a shared middleware to the chain
    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        let mut mws = (*self.middlewares).clone();
        mws.push(middleware);
        self.middlewares = Arc::new(mws);
    }

    /// Builder form of [`use_middleware`](Self::use_middleware).
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.use_middleware(middleware);
        self
    }

    /// A new chain running this chain's stages followed by `middleware`.
    /// `self` is left untouched.
    pub fn append<M: Middleware + 'static>(&self, middleware: M) -> Self {
        self.clone().with(middleware)
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Execute the middleware chain with a handler
    pub async fn apply(
        &self,
        req: HttpRequest,
        ctx: RequestContext,
        handler: HandlerFn,
    ) -> Result<HttpResponse, Error> {
        trace!(
            middleware_count = self.middlewares.len(),
            path = %req.path,
            method = %req.method,
            "Executing middleware chain"
        );
        self.execute_from(0, req, ctx, handler).await
    }

    /// Compose the chain and `handler` into one handler, once, at startup.
    pub fn then(&self, handler: HandlerFn) -> HandlerFn {
        let chain = self.clone();
        Arc::new(move |req, ctx| chain.execute_from(0, req, ctx, handler.clone()))
    }

    fn execute_from(
        &self,
        index: usize,
        req: HttpRequest,
        ctx: RequestContext,
        handler: HandlerFn,
    ) -> HandlerFuture {
        if index >= self.middlewares.len() {
            handler(req, ctx)
        } else {
            let middleware = self.middlewares[index].clone();
            let chain = self.clone();

            Box::pin(async move {
                middleware
                    .handle(
                        req,
                        ctx,
                        Box::new(move |req, ctx| chain.execute_from(index + 1, req, ctx, handler)),
                    )
                    .await
            })
        }
    }
}

impl Default for MiddlewareChain {
    fn default() -> Self {
        Self::new()
    }
}

// ========== Built-in Middleware ==========

/// Outermost stage: turns panics and errors from everything inside it into
/// responses.
///
/// A panic is logged and answered with a generic 500 carrying
/// `Connection: close`, so the connection it happened on is not reused.
pub struct RecoverPanicMiddleware;

impl RecoverPanicMiddleware {
    pub fn new() -> Self {
        Self
    }

    fn panic_response(payload: Box<dyn Any + Send>) -> HttpResponse {
        error!(panic = %panic_message(payload.as_ref()), "recovered from panic");

        HttpResponse::internal_server_error()
            .with_header("Connection", "close")
            .with_text("Internal Server Error")
    }
}

impl Default for RecoverPanicMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for RecoverPanicMiddleware {
    async fn handle(
        &self,
        req: HttpRequest,
        ctx: RequestContext,
        next: Next,
    ) -> Result<HttpResponse, Error> {
        // `next` may panic while building its future as well as while polling it.
        let future = match std::panic::catch_unwind(AssertUnwindSafe(|| next(req, ctx))) {
            Ok(future) => future,
            Err(payload) => return Ok(Self::panic_response(payload)),
        };

        match AssertUnwindSafe(future).catch_unwind().await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(err)) => Ok(err.into_response()),
            Err(payload) => Ok(Self::panic_response(payload)),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Logs every request before it is handled, whatever the outcome.
///
/// # Examples
///
/// ```
/// use daybook_core::{MiddlewareChain, RequestLoggingMiddleware};
///
/// let mut chain = MiddlewareChain::new();
/// chain.use_middleware(RequestLoggingMiddleware::new());
/// ```
pub struct RequestLoggingMiddleware {
    /// Also log status and duration once the response is ready
    pub log_responses: bool,
}

impl RequestLoggingMiddleware {
    pub fn new() -> Self {
        Self {
            log_responses: true,
        }
    }

    pub fn with_responses(mut self, enable: bool) -> Self {
        self.log_responses = enable;
        self
    }
}

impl Default for RequestLoggingMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for RequestLoggingMiddleware {
    async fn handle(
        &self,
        req: HttpRequest,
        ctx: RequestContext,
        next: Next,
    ) -> Result<HttpResponse, Error> {
        let start = Instant::now();
        let method = req.method.clone();
        let uri = req.uri();
        let ip = req
            .remote_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "-".to_string());

        info!(
            ip = %ip,
            proto = %req.version,
            method = %method,
            uri = %uri,
            "received request"
        );

        let result = next(req, ctx).await;

        if self.log_responses {
            let status = match &result {
                Ok(response) => response.status,
                Err(err) => err.status_code(),
            };
            info!(
                method = %method,
                uri = %uri,
                status,
                duration_ms = start.elapsed().as_millis() as u64,
                "request completed"
            );
        }

        result
    }
}

/// Adds browser hardening headers to every response, error pages included.
pub struct SecurityHeadersMiddleware {
    content_security_policy: Option<String>,
    referrer_policy: Option<String>,
    nosniff_enabled: bool,
    frame_options: Option<String>,
    xss_protection: Option<String>,
    hsts_enabled: bool,
}

impl SecurityHeadersMiddleware {
    pub fn new() -> Self {
        Self {
            content_security_policy: Some(
                "default-src 'self'; style-src 'self' fonts.googleapis.com; font-src fonts.gstatic.com"
                    .to_string(),
            ),
            referrer_policy: Some("origin-when-cross-origin".to_string()),
            nosniff_enabled: true,
            frame_options: Some("deny".to_string()),
            // Legacy XSS auditors do more harm than good; "0" turns them off.
            xss_protection: Some("0".to_string()),
            hsts_enabled: false,
        }
    }

    pub fn with_content_security_policy(mut self, policy: &str) -> Self {
        self.content_security_policy = Some(policy.to_string());
        self
    }

    pub fn with_referrer_policy(mut self, policy: &str) -> Self {
        self.referrer_policy = Some(policy.to_string());
        self
    }

    pub fn with_frame_options(mut self, value: &str) -> Self {
        self.frame_options = Some(value.to_string());
        self
    }

    /// Only enable behind TLS.
    pub fn with_hsts(mut self, enabled: bool) -> Self {
        self.hsts_enabled = enabled;
        self
    }
}

impl Default for SecurityHeadersMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Middleware for SecurityHeadersMiddleware {
    async fn handle(
        &self,
        req: HttpRequest,
        ctx: RequestContext,
        next: Next,
    ) -> Result<HttpResponse, Error> {
        let mut response = match next(req, ctx).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        };

        let headers = &mut response.headers;

        if let Some(csp) = &self.content_security_policy {
            headers.insert("Content-Security-Policy".to_string(), csp.clone());
        }

        if let Some(policy) = &self.referrer_policy {
            headers.insert("Referrer-Policy".to_string(), policy.clone());
        }

        if self.nosniff_enabled {
            headers.insert("X-Content-Type-Options".to_string(), "nosniff".to_string());
        }

        if let Some(frame_opts) = &self.frame_options {
            headers.insert("X-Frame-Options".to_string(), frame_opts.clone());
        }

        if let Some(xss) = &self.xss_protection {
            headers.insert("X-XSS-Protection".to_string(), xss.clone());
        }

        if self.hsts_enabled {
            headers.insert(
                "Strict-Transport-Security".to_string(),
                "max-age=31536000; includeSubDomains".to_string(),
            );
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Recorder {
        fn push(&self, entry: impl Into<String>) {
            self.0.lock().unwrap().push(entry.into());
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct Tag(&'static str, Recorder);

    #[async_trait]
    impl Middleware for Tag {
        async fn handle(
            &self,
            req: HttpRequest,
            ctx: RequestContext,
            next: Next,
        ) -> Result<HttpResponse, Error> {
            self.1.push(format!("{} in", self.0));
            let response = next(req, ctx).await;
            self.1.push(format!("{} out", self.0));
            response
        }
    }

    struct ShortCircuit;

    #[async_trait]
    impl Middleware for ShortCircuit {
        async fn handle(
            &self,
            _req: HttpRequest,
            _ctx: RequestContext,
            _next: Next,
        ) -> Result<HttpResponse, Error> {
            Ok(HttpResponse::see_other("/users/login"))
        }
    }

    fn request() -> HttpRequest {
        HttpRequest::new("GET".to_string(), "/test".to_string())
    }

    fn ok_next() -> Next {
        Box::new(|_req, _ctx| Box::pin(async { Ok(HttpResponse::ok()) }))
    }

    #[tokio::test]
    async fn test_first_added_is_outermost() {
        let recorder = Recorder::default();
        let chain = MiddlewareChain::new()
            .with(Tag("a", recorder.clone()))
            .with(Tag("b", recorder.clone()));

        let seen = recorder.clone();
        let handler = handler(move |_req, _ctx| {
            let seen = seen.clone();
            async move {
                seen.push("handler");
                Ok(HttpResponse::ok())
            }
        });

        let response = chain
            .apply(request(), RequestContext::new(), handler)
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(
            recorder.entries(),
            vec!["a in", "b in", "handler", "b out", "a out"]
        );
    }

    #[tokio::test]
    async fn test_short_circuit_skips_handler() {
        let recorder = Recorder::default();
        let chain = MiddlewareChain::new().with(ShortCircuit);

        let seen = recorder.clone();
        let handler = handler(move |_req, _ctx| {
            let seen = seen.clone();
            async move {
                seen.push("handler");
                Ok(HttpResponse::ok())
            }
        });

        let response = chain
            .then(handler)(request(), RequestContext::new())
            .await
            .unwrap();
        assert_eq!(response.status, 303);
        assert!(recorder.entries().is_empty());
    }

    #[tokio::test]
    async fn test_append_leaves_original_chain() {
        let recorder = Recorder::default();
        let dynamic = MiddlewareChain::new().with(Tag("dynamic", recorder.clone()));
        let protected = dynamic.append(Tag("gate", recorder.clone()));

        assert_eq!(dynamic.len(), 1);
        assert_eq!(protected.len(), 2);
    }

    #[tokio::test]
    async fn test_recover_panic_in_handler() {
        let chain = MiddlewareChain::new().with(RecoverPanicMiddleware::new());
        let handler = handler(|_req, _ctx| async {
            if true {
                panic!("boom");
            }
            Ok(HttpResponse::ok())
        });

        let response = chain
            .apply(request(), RequestContext::new(), handler)
            .await
            .unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(response.header("connection"), Some("close"));
        assert_eq!(response.body, b"Internal Server Error");
    }

    #[tokio::test]
    async fn test_recover_panic_while_building_future() {
        let middleware = RecoverPanicMiddleware::new();
        let response = middleware
            .handle(
                request(),
                RequestContext::new(),
                Box::new(|_req: HttpRequest, _ctx: RequestContext| -> HandlerFuture {
                    panic!("eager")
                }),
            )
            .await
            .unwrap();
        assert_eq!(response.status, 500);
    }

    #[tokio::test]
    async fn test_recover_converts_errors() {
        let middleware = RecoverPanicMiddleware::new();
        let response = middleware
            .handle(
                request(),
                RequestContext::new(),
                Box::new(|_req, _ctx| {
                    Box::pin(async { Err(Error::NotFound("nothing here".to_string())) })
                }),
            )
            .await
            .unwrap();
        assert_eq!(response.status, 404);
        assert!(response.header("connection").is_none());
    }

    #[tokio::test]
    async fn test_security_headers_middleware() {
        let middleware = SecurityHeadersMiddleware::new();
        let response = middleware
            .handle(request(), RequestContext::new(), ok_next())
            .await
            .unwrap();

        assert_eq!(response.header("X-Content-Type-Options"), Some("nosniff"));
        assert_eq!(response.header("X-Frame-Options"), Some("deny"));
        assert_eq!(response.header("X-XSS-Protection"), Some("0"));
        assert_eq!(
            response.header("Referrer-Policy"),
            Some("origin-when-cross-origin")
        );
        assert!(response.header("Content-Security-Policy").is_some());
        assert!(response.header("Strict-Transport-Security").is_none());
    }

    #[tokio::test]
    async fn test_security_headers_on_error_pages() {
        let middleware = SecurityHeadersMiddleware::new().with_hsts(true);
        let response = middleware
            .handle(
                request(),
                RequestContext::new(),
                Box::new(|_req, _ctx| Box::pin(async { Err(Error::NotFound("x".to_string())) })),
            )
            .await
            .unwrap();

        assert_eq!(response.status, 404);
        assert!(response.header("X-Frame-Options").is_some());
        assert!(response.header("Strict-Transport-Security").is_some());
    }

    #[tokio::test]
    async fn test_request_logging_passes_through() {
        let middleware = RequestLoggingMiddleware::new();
        let req = request().with_remote_addr("127.0.0.1:4000".parse().unwrap());
        let response = middleware
            .handle(req, RequestContext::new(), ok_next())
            .await
            .unwrap();
        assert_eq!(response.status, 200);

        let result = middleware
            .handle(
                request(),
                RequestContext::new(),
                Box::new(|_req, _ctx| Box::pin(async { Err(Error::Internal("x".to_string())) })),
            )
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
