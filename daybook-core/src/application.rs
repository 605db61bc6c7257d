// HTTP server

use crate::logging::{debug, error, info, warn};
use crate::middleware::HandlerFn;
use crate::{Error, HttpRequest, HttpResponse, RequestContext};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode, body::Incoming as IncomingBody};
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

/// Serves a single composed handler over HTTP/1.
///
/// The handler is normally a router wrapped in the standard pipeline, built
/// once at startup.
pub struct Application {
    handler: HandlerFn,
    shutdown_timeout: Duration,
}

impl Application {
    pub fn new(handler: HandlerFn) -> Self {
        Self {
            handler,
            shutdown_timeout: Duration::from_secs(10),
        }
    }

    /// How long in-flight connections may take to finish after shutdown starts.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    /// Run one request through the handler without a socket.
    pub async fn handle(&self, req: HttpRequest) -> HttpResponse {
        dispatch(&self.handler, req).await
    }

    /// Bind `addr` and serve until ctrl-c.
    pub async fn listen(self, addr: &str) -> Result<(), Error> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr = %listener.local_addr()?, "starting server");

        self.serve(listener, async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(error = %err, "failed to listen for shutdown signal");
            }
        })
        .await
    }

    /// Serve connections from `listener` until `shutdown` completes, then
    /// wait for open connections to finish.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        let graceful = GracefulShutdown::new();
        let mut shutdown = std::pin::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, remote_addr) = match accepted {
                        Ok(accepted) => accepted,
                        Err(err) => {
                            warn!(error = %err, "failed to accept connection");
                            continue;
                        }
                    };

                    let handler = self.handler.clone();
                    let service = service_fn(move |req: Request<IncomingBody>| {
                        let handler = handler.clone();
                        async move { handle_request(req, remote_addr, handler).await }
                    });

                    let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
                    let conn = graceful.watch(conn);

                    tokio::spawn(async move {
                        if let Err(err) = conn.await {
                            debug!(error = %err, remote_addr = %remote_addr, "connection closed with error");
                        }
                    });
                }
                _ = &mut shutdown => {
                    info!("shutting down server");
                    break;
                }
            }
        }

        drop(listener);

        tokio::select! {
            _ = graceful.shutdown() => {
                info!("all connections closed");
            }
            _ = tokio::time::sleep(self.shutdown_timeout) => {
                warn!("timed out waiting for connections to close");
            }
        }

        Ok(())
    }
}

async fn dispatch(handler: &HandlerFn, req: HttpRequest) -> HttpResponse {
    match handler(req, RequestContext::new()).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

/// Handle an incoming HTTP request
async fn handle_request(
    req: Request<IncomingBody>,
    remote_addr: SocketAddr,
    handler: HandlerFn,
) -> Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().to_string();
    let uri = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let mut request = HttpRequest::new(method, uri).with_remote_addr(remote_addr);
    request.version = format!("{:?}", req.version());

    for (name, value) in req.headers() {
        let Ok(value) = value.to_str() else {
            continue;
        };
        let separator = if name == hyper::header::COOKIE { "; " } else { ", " };
        request
            .headers
            .entry(name.to_string())
            .and_modify(|existing| {
                existing.push_str(separator);
                existing.push_str(value);
            })
            .or_insert_with(|| value.to_string());
    }

    request.body = req.collect().await?.to_bytes().to_vec();

    Ok(into_hyper(dispatch(&handler, request).await))
}

fn into_hyper(response: HttpResponse) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(response.status);

    for (key, value) in &response.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }

    builder
        .body(Full::new(Bytes::from(response.body)))
        .unwrap_or_else(|err| {
            error!(error = %err, "handler produced an invalid response");
            let mut fallback = Response::new(Full::new(Bytes::from_static(b"Internal Server Error")));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::handler;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_handle_converts_errors() {
        let app = Application::new(handler(|_req, _ctx| async {
            Err(Error::NotFound("nothing".to_string()))
        }));
        let response = app
            .handle(HttpRequest::new("GET".to_string(), "/".to_string()))
            .await;
        assert_eq!(response.status, 404);
    }

    #[test]
    fn test_into_hyper_keeps_headers() {
        let response = into_hyper(HttpResponse::see_other("/users/login"));
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()["location"], "/users/login");
    }

    #[test]
    fn test_into_hyper_rejects_bad_header() {
        let response = into_hyper(HttpResponse::ok().with_header("Bad Header", "x"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_serve_over_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

        let app = Application::new(handler(|req, _ctx| async move {
            let peer = req.remote_addr.map(|a| a.ip().to_string()).unwrap_or_default();
            Ok(HttpResponse::ok()
                .with_header("Connection", "close")
                .with_text(format!("{} {}", req.uri(), peer)))
        }))
        .with_shutdown_timeout(Duration::from_secs(1));

        let server = tokio::spawn(app.serve(listener, async {
            let _ = stop_rx.await;
        }));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /days/view/1?x=2 HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();

        assert!(raw.starts_with("HTTP/1.1 200 OK"));
        assert!(raw.ends_with("/days/view/1?x=2 127.0.0.1"));

        stop_tx.send(()).unwrap();
        server.await.unwrap().unwrap();
    }
}
