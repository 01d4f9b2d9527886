//! # nonceguard
//!
//! Single-use anti-replay nonces for a minimal hyper-based HTTP framework.
//!
//! A nonce is a capability: the server mints it into one response, the
//! client presents it on the next request, and it is consumed on
//! presentation. A replayed or stale nonce is reported as
//! [`Verdict::Invalid`](middleware::nonce::Verdict::Invalid); what to do
//! about it is the handler's decision.
//!
//! The pieces:
//!
//! - [`middleware::nonce`] — the guard, its store worker, and the sweeper
//! - [`Router`] — radix-tree routing via [`matchit`]
//! - [`Server`] — hyper, HTTP/1.1 + HTTP/2, graceful shutdown on SIGTERM
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::{Method, StatusCode};
//! use nonceguard::middleware::nonce::{NonceConfig, NonceGuard};
//! use nonceguard::{Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let guard = NonceGuard::new(NonceConfig::default());
//!     let app = Router::new()
//!         .on(Method::GET,  "/transfer", guard.layer(start))
//!         .on(Method::POST, "/transfer", guard.layer(commit));
//!
//!     Server::bind(([0, 0, 0, 0], 3000)).serve(app).await.unwrap();
//! }
//!
//! async fn start(req: Request) -> Response {
//!     let mut res = Response::status(StatusCode::NO_CONTENT);
//!     match req.issue_nonce(&mut res).await {
//!         Ok(_) => res,
//!         Err(_) => Response::status(StatusCode::INTERNAL_SERVER_ERROR),
//!     }
//! }
//!
//! async fn commit(req: Request) -> StatusCode {
//!     if req.nonce_verdict().is_valid() {
//!         StatusCode::OK
//!     } else {
//!         StatusCode::FORBIDDEN
//!     }
//! }
//! ```

mod error;
mod handler;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;

pub use error::{Error, Result};
pub use handler::{Handler, Layer, Layered};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
