// Application state and route table

use daybook_auth::{Authenticate, IdentityStore, PasswordHasher, RequireAuthentication};
use daybook_config::AppConfig;
use daybook_core::{
    Error, HandlerFn, HttpRequest, HttpResponse, MiddlewareChain, RecoverPanicMiddleware,
    RequestContext, RequestLoggingMiddleware, Router, SecurityHeadersMiddleware,
    SessionMiddleware, handler,
};
use daybook_csrf::{CsrfConfig, CsrfMiddleware};
use daybook_session::{MemorySessionStore, SessionConfig, SessionStore};
use std::future::Future;
use std::sync::Arc;

use crate::handlers;
use crate::models::{DayStore, MemoryDayStore, MemoryUserStore, UserStore};
use crate::static_files::StaticFiles;

/// Everything the handlers share.
pub struct App {
    pub days: Arc<dyn DayStore>,
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub session_config: SessionConfig,
    pub static_files: StaticFiles,
}

impl App {
    /// In-memory stores configured from `config`.
    pub fn in_memory(config: &AppConfig) -> Self {
        Self::with_session_store(config, Arc::new(MemorySessionStore::new()))
    }

    /// In-memory diary and accounts with the given session store.
    pub fn with_session_store(config: &AppConfig, sessions: Arc<dyn SessionStore>) -> Self {
        Self {
            days: Arc::new(MemoryDayStore::new()),
            users: Arc::new(MemoryUserStore::new(PasswordHasher::new(config.bcrypt_cost))),
            sessions,
            session_config: session_config(config),
            static_files: StaticFiles::new(config.static_dir.clone()),
        }
    }

    /// Compose the pipelines and the router into the server's entry handler.
    pub fn routes(self) -> HandlerFn {
        let app = Arc::new(self);
        let identities: Arc<dyn IdentityStore> = app.users.clone();

        let dynamic = MiddlewareChain::new()
            .with(SessionMiddleware::new(
                app.sessions.clone(),
                app.session_config.clone(),
            ))
            .with(CsrfMiddleware::new(CsrfConfig::default()))
            .with(Authenticate::new(identities));
        let protected = dynamic.append(RequireAuthentication::new());

        let files = app.static_files.clone();
        let router = Router::new()
            .get("/ping", handler(handlers::ping))
            .get(
                "/static/*filepath",
                handler(move |req, _ctx| {
                    let files = files.clone();
                    async move { files.serve(&req).await }
                }),
            )
            .get("/users/signup", dynamic.then(bind(&app, handlers::user_signup)))
            .post("/users/signup", dynamic.then(bind(&app, handlers::user_signup_post)))
            .get("/users/login", dynamic.then(bind(&app, handlers::user_login)))
            .post("/users/login", dynamic.then(bind(&app, handlers::user_login_post)))
            .get("/", protected.then(bind(&app, handlers::home)))
            .get("/days/view/:id", protected.then(bind(&app, handlers::day_view)))
            .get("/days/create", protected.then(bind(&app, handlers::day_create)))
            .post("/days/create", protected.then(bind(&app, handlers::day_create_post)))
            .post("/users/logout", protected.then(bind(&app, handlers::user_logout_post)))
            .get("/users/account", protected.then(bind(&app, handlers::account_view)))
            .with_not_found(handler(handlers::not_found));

        let standard = MiddlewareChain::new()
            .with(RecoverPanicMiddleware::new())
            .with(RequestLoggingMiddleware::new())
            .with(SecurityHeadersMiddleware::new());

        standard.then(router.into_handler())
    }
}

fn session_config(config: &AppConfig) -> SessionConfig {
    SessionConfig::default()
        .with_lifetime(config.session_lifetime)
        .with_cookie_secure(config.cookie_secure)
}

/// Turn a handler that needs the shared state into a [`HandlerFn`].
fn bind<F, Fut>(app: &Arc<App>, f: F) -> HandlerFn
where
    F: Fn(Arc<App>, HttpRequest, RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    let app = app.clone();
    handler(move |req, ctx| f(app.clone(), req, ctx))
}
