use daybook_core::*;
use daybook_csrf::{CsrfConfig, CsrfMiddleware, CsrfToken};
use daybook_session::{MemorySessionStore, SessionConfig, SessionStore};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Harness {
    store: Arc<MemorySessionStore>,
    calls: Arc<AtomicUsize>,
    entry: HandlerFn,
}

fn harness() -> Harness {
    let store = Arc::new(MemorySessionStore::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let chain = MiddlewareChain::new()
        .with(SessionMiddleware::new(
            store.clone(),
            SessionConfig::default().with_cookie_secure(false),
        ))
        .with(CsrfMiddleware::new(CsrfConfig::default()));

    let seen = calls.clone();
    let entry = chain.then(handler(move |req, ctx| {
        let seen = seen.clone();
        async move {
            seen.fetch_add(1, Ordering::SeqCst);
            if req.path == "/login" {
                ctx.require_session()?.renew().await?;
            }
            Ok(HttpResponse::ok().with_text(ctx.csrf_token().unwrap_or_default()))
        }
    }));

    Harness {
        store,
        calls,
        entry,
    }
}

fn cookie(response: &HttpResponse) -> String {
    response
        .header("set-cookie")
        .and_then(|c| c.split(';').next())
        .unwrap()
        .to_string()
}

async fn stored_token(store: &MemorySessionStore, cookie: &str) -> String {
    let token = cookie.trim_start_matches("session=");
    store
        .load(token)
        .await
        .unwrap()
        .unwrap()
        .get::<String>("csrf_token")
        .unwrap()
}

#[tokio::test]
async fn test_form_round_trip() {
    let h = harness();

    let page = (h.entry)(
        HttpRequest::new("GET".to_string(), "/form".to_string()),
        RequestContext::new(),
    )
    .await
    .unwrap();
    let rendered = String::from_utf8(page.body.clone()).unwrap();
    let cookie = cookie(&page);
    assert!(!rendered.is_empty());

    let response = (h.entry)(
        HttpRequest::new("POST".to_string(), "/form".to_string())
            .with_header("Cookie", cookie)
            .with_header("Content-Type", "application/x-www-form-urlencoded")
            .with_body(format!("title=hello&csrf_token={}", rendered)),
        RequestContext::new(),
    )
    .await
    .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_missing_token_rejected_before_handler() {
    let h = harness();

    let err = tokio_test::block_on((h.entry)(
        HttpRequest::new("POST".to_string(), "/form".to_string()).with_body("title=hello"),
        RequestContext::new(),
    ))
    .unwrap_err();

    assert_eq!(err.status_code(), 400);
    assert_eq!(h.calls.load(Ordering::SeqCst), 0);
    assert_eq!(tokio_test::block_on(h.store.count()).unwrap(), 0);
}

#[tokio::test]
async fn test_token_from_other_session_rejected() {
    let h = harness();

    let page = (h.entry)(
        HttpRequest::new("GET".to_string(), "/form".to_string()),
        RequestContext::new(),
    )
    .await
    .unwrap();
    let cookie = cookie(&page);

    let response = (h.entry)(
        HttpRequest::new("POST".to_string(), "/form".to_string())
            .with_header("Cookie", cookie)
            .with_header("X-CSRF-Token", CsrfToken::generate().masked()),
        RequestContext::new(),
    )
    .await;

    assert_eq!(response.unwrap_err().status_code(), 400);
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_token_replaced_when_session_renewed() {
    let h = harness();

    let page = (h.entry)(
        HttpRequest::new("GET".to_string(), "/form".to_string()),
        RequestContext::new(),
    )
    .await
    .unwrap();
    let rendered = String::from_utf8(page.body.clone()).unwrap();
    let before_cookie = cookie(&page);
    let before = stored_token(&h.store, &before_cookie).await;

    let response = (h.entry)(
        HttpRequest::new("POST".to_string(), "/login".to_string())
            .with_header("Cookie", before_cookie.clone())
            .with_header("X-CSRF-Token", rendered.clone()),
        RequestContext::new(),
    )
    .await
    .unwrap();
    let after_cookie = cookie(&response);
    assert_ne!(after_cookie, before_cookie);

    let after = stored_token(&h.store, &after_cookie).await;
    assert_ne!(before, after);

    // The token rendered before the renewal no longer works.
    let err = (h.entry)(
        HttpRequest::new("POST".to_string(), "/form".to_string())
            .with_header("Cookie", after_cookie)
            .with_header("X-CSRF-Token", rendered),
        RequestContext::new(),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status_code(), 400);
}
