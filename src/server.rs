//! HTTP server and graceful shutdown.
//!
//! On SIGTERM or Ctrl-C the server stops accepting connections and asks
//! every open connection to close: idle keep-alive connections go at once,
//! busy ones after their current response. [`Server::serve`] returns when
//! the last one is gone.
//! Nonce state lives in the guards captured by the router, so it is
//! released when the router is dropped after shutdown.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust
    /// use nonceguard::Server;
    /// let server = Server::bind(([0, 0, 0, 0], 3000));
    /// ```
    pub fn bind(addr: impl Into<SocketAddr>) -> Self {
        Self { addr: addr.into() }
    }

    /// Starts accepting connections and dispatching them through `router`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C).
    ///
    /// # Errors
    ///
    /// Fails if the listener cannot bind.
    pub async fn serve(self, router: Router) -> Result<()> {
        self.serve_with_shutdown(router, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but stops when `shutdown` resolves
    /// instead of on a process signal.
    ///
    /// # Errors
    ///
    /// Fails if the listener cannot bind.
    pub async fn serve_with_shutdown(
        self,
        router: Router,
        shutdown: impl Future<Output = ()>,
    ) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "nonceguard listening");
        run(listener, router, shutdown).await;
        Ok(())
    }
}

/// Accept loop. Once `shutdown` resolves, every open connection is told to
/// finish its current request and close, and the loop waits for all of them.
async fn run(listener: TcpListener, router: Router, shutdown: impl Future<Output = ()>) {
    let router = Arc::new(router);
    let mut tasks = tokio::task::JoinSet::new();
    let (stop_tx, stop_rx) = watch::channel(());

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            // Check shutdown first so a signal stops accepting immediately.
            biased;

            () = &mut shutdown => {
                info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                break;
            }

            res = listener.accept() => {
                let (stream, remote_addr) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                let router = Arc::clone(&router);
                let mut stop = stop_rx.clone();
                let io = TokioIo::new(stream);

                tasks.spawn(async move {
                    let svc = service_fn(move |req| {
                        let router = Arc::clone(&router);
                        async move { dispatch(router, req, remote_addr).await }
                    });

                    // auto::Builder serves HTTP/1.1 and HTTP/2, whichever
                    // the client negotiates.
                    let builder = ConnBuilder::new(TokioExecutor::new());
                    let conn = builder.serve_connection(io, svc);
                    tokio::pin!(conn);

                    let res = tokio::select! {
                        res = conn.as_mut() => res,
                        _ = stop.changed() => {
                            // Idle keep-alive connections close now; busy
                            // ones finish the request in flight first.
                            conn.as_mut().graceful_shutdown();
                            conn.await
                        }
                    };
                    if let Err(e) = res {
                        error!(peer = %remote_addr, "connection error: {e}");
                    }
                });
            }

            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    drop(listener);
    let _ = stop_tx.send(());
    while tasks.join_next().await.is_some() {}

    info!("nonceguard stopped");
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Converts one hyper request, routes it, and converts the response back.
/// Failures become HTTP statuses, so hyper never sees an error.
async fn dispatch(
    router: Arc<Router>,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
) -> std::result::Result<http::Response<Full<Bytes>>, Infallible> {
    let response = match Request::from_hyper(req).await {
        Ok(req) => router.handle(req).await,
        Err(e) => {
            warn!(peer = %remote_addr, "failed to read request body: {e}");
            Response::status(StatusCode::BAD_REQUEST)
        }
    };

    Ok(response.into_inner())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM or SIGINT (Ctrl-C only on Windows).
///
/// A handler that fails to install is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use http::Method;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    use super::*;

    async fn ping(_req: Request) -> &'static str {
        "pong"
    }

    #[tokio::test]
    async fn shutdown_closes_idle_keep_alive_connections() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (trigger, fired) = oneshot::channel::<()>();
        let router = Router::new().on(Method::GET, "/ping", ping);

        let server = tokio::spawn(run(listener, router, async {
            let _ = fired.await;
        }));

        let mut client = TcpStream::connect(addr).await.unwrap();
        client
            .write_all(b"GET /ping HTTP/1.1\r\nhost: localhost\r\n\r\n")
            .await
            .unwrap();
        let mut buf = [0u8; 512];
        let n = client.read(&mut buf).await.unwrap();
        assert!(buf[..n].starts_with(b"HTTP/1.1 200 OK"));

        // The client keeps its socket open; shutdown must not wait for it.
        trigger.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server did not stop with an idle connection open")
            .unwrap();

        assert!(matches!(client.read(&mut buf).await, Ok(0) | Err(_)));
    }

    #[tokio::test]
    async fn serve_with_shutdown_returns_ok() {
        let server = Server::bind(([127, 0, 0, 1], 0));
        let res = tokio::time::timeout(
            Duration::from_secs(5),
            server.serve_with_shutdown(Router::new(), async {}),
        )
        .await
        .unwrap();
        assert!(res.is_ok());
    }
}
