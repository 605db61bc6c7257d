// Routing system for HTTP requests

use crate::logging::debug;
use crate::middleware::HandlerFn;
use crate::{Error, HttpMethod, HttpRequest, HttpResponse, HttpStatus, RequestContext};
use std::collections::HashMap;
use std::sync::Arc;

/// Route definition with handler
#[derive(Clone)]
pub struct Route {
    pub method: HttpMethod,
    /// Pattern with `:name` segments and an optional trailing `*name`
    pub path: String,
    pub handler: HandlerFn,
}

/// Router for managing routes and dispatching requests
///
/// Routes are tried in registration order. Handlers are expected to have their
/// pipeline applied already, so routes can use different pipelines.
#[derive(Clone, Default)]
pub struct Router {
    pub routes: Vec<Route>,
    not_found: Option<HandlerFn>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route to the router
    pub fn add_route(&mut self, route: Route) {
        self.routes.push(route);
    }

    pub fn handle(mut self, method: HttpMethod, path: &str, handler: HandlerFn) -> Self {
        self.add_route(Route {
            method,
            path: path.to_string(),
            handler,
        });
        self
    }

    pub fn get(self, path: &str, handler: HandlerFn) -> Self {
        self.handle(HttpMethod::GET, path, handler)
    }

    pub fn post(self, path: &str, handler: HandlerFn) -> Self {
        self.handle(HttpMethod::POST, path, handler)
    }

    /// Handler for requests no route matches. Without one they fail with
    /// [`Error::NotFound`].
    pub fn with_not_found(mut self, handler: HandlerFn) -> Self {
        self.not_found = Some(handler);
        self
    }

    /// Find a route that matches the request and run it
    pub async fn route(
        &self,
        mut request: HttpRequest,
        ctx: RequestContext,
    ) -> Result<HttpResponse, Error> {
        let mut allowed = Vec::new();

        for route in &self.routes {
            let Some(params) = match_path(&route.path, &request.path) else {
                continue;
            };

            if route.method.as_str() != request.method {
                allowed.push(route.method.as_str());
                continue;
            }

            request.path_params = params;
            return (route.handler)(request, ctx).await;
        }

        if !allowed.is_empty() {
            debug!(method = %request.method, path = %request.path, "method not allowed");
            allowed.dedup();
            let status = HttpStatus::MethodNotAllowed;
            return Ok(HttpResponse::new(status.code())
                .with_header("Allow", allowed.join(", "))
                .with_text(status.reason()));
        }

        match &self.not_found {
            Some(handler) => handler(request, ctx).await,
            None => Err(Error::NotFound(format!("{} {}", request.method, request.path))),
        }
    }

    /// Freeze the router into a single handler.
    pub fn into_handler(self) -> HandlerFn {
        let router = Arc::new(self);
        Arc::new(move |req, ctx| {
            let router = router.clone();
            Box::pin(async move { router.route(req, ctx).await })
        })
    }
}

/// Match a route path pattern against a request path
/// Returns Some(params) if matched, None otherwise
///
/// Segments are compared exactly, so a trailing or doubled slash is a
/// different path.
fn match_path(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let pattern_parts = segments(pattern);
    let path_parts = segments(path);

    let mut params = HashMap::new();

    if let Some((last, fixed)) = pattern_parts.split_last() {
        if let Some(name) = last.strip_prefix('*') {
            if path_parts.len() < fixed.len() || !match_segments(fixed, &path_parts, &mut params)
            {
                return None;
            }
            params.insert(name.to_string(), path_parts[fixed.len()..].join("/"));
            return Some(params);
        }
    }

    if pattern_parts.len() != path_parts.len()
        || !match_segments(&pattern_parts, &path_parts, &mut params)
    {
        return None;
    }

    Some(params)
}

fn segments(path: &str) -> Vec<&str> {
    path.strip_prefix('/').unwrap_or(path).split('/').collect()
}

fn match_segments(
    pattern_parts: &[&str],
    path_parts: &[&str],
    params: &mut HashMap<String, String>,
) -> bool {
    for (pattern_part, path_part) in pattern_parts.iter().zip(path_parts.iter()) {
        if let Some(param_name) = pattern_part.strip_prefix(':') {
            if path_part.is_empty() {
                return false;
            }
            params.insert(param_name.to_string(), path_part.to_string());
        } else if pattern_part != path_part {
            return false;
        }
    }
    true
}
