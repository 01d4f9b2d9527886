//! Anti-replay nonces.
//!
//! A [`NonceGuard`] wraps a handler. On every request it looks for an
//! inbound nonce (the `X-Nonce` header by default), consumes it from the
//! store, and records a [`Verdict`] on the request. Downstream code reads
//! the verdict and, when it wants the client to come back with a fresh
//! token, calls [`Request::issue_nonce`] to mint one into the response.
//!
//! Every nonce is single-use: presenting it removes it, valid or not.
//! Unpresented nonces are dropped by a background sweep once older than
//! the configured age.
//!
//! ```rust,no_run
//! use http::{Method, StatusCode};
//! use nonceguard::middleware::nonce::{NonceConfig, NonceGuard};
//! use nonceguard::{Request, Response, Router};
//!
//! async fn form(req: Request) -> Response {
//!     let mut res = Response::text("fill me in");
//!     if req.issue_nonce(&mut res).await.is_err() {
//!         return Response::status(StatusCode::INTERNAL_SERVER_ERROR);
//!     }
//!     res
//! }
//!
//! async fn submit(req: Request) -> Response {
//!     if !req.nonce_verdict().is_valid() {
//!         return Response::status(StatusCode::FORBIDDEN);
//!     }
//!     Response::text("accepted")
//! }
//!
//! # #[tokio::main] async fn main() {
//! let guard = NonceGuard::new(NonceConfig::default());
//! let app = Router::new()
//!     .on(Method::GET,  "/form", guard.layer(form))
//!     .on(Method::POST, "/form", guard.layer(submit));
//! # }
//! ```

mod clock;
mod config;
mod store;
mod strategy;
mod sweeper;
mod token;

use std::future::Future;
use std::sync::Arc;

use tracing::debug;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DEFAULT_AGE, DEFAULT_SWEEP_INTERVAL, NonceConfig};
pub use store::NonceStore;
pub use strategy::{Extractor, HeaderStrategy, Injector, NONCE_HEADER};
pub use sweeper::Sweeper;
pub use token::{Generator, OsRandomGenerator, TimeRandomGenerator, Token};

use crate::error::Result;
use crate::handler::{Handler, Layer, Layered};
use crate::request::Request;
use crate::response::Response;

/// Outcome of checking a request's inbound nonce.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Verdict {
    /// The request carried no nonce.
    NotPresented,
    /// The nonce was live and fresh; it has now been consumed.
    Valid,
    /// The nonce was unknown, already used, or expired.
    Invalid,
}

impl Verdict {
    /// Whether the request presented a live nonce.
    pub fn is_valid(self) -> bool {
        self == Self::Valid
    }
}

/// Per-request nonce state: the verdict plus the capability to issue a new
/// token into the response.
#[derive(Clone)]
pub struct NonceContext {
    verdict: Verdict,
    store: NonceStore,
    injector: Arc<dyn Injector>,
}

impl NonceContext {
    /// The outcome recorded when the request was screened.
    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// Issues a fresh token and injects it into `res`.
    ///
    /// # Errors
    ///
    /// Generation or injection failures; neither is retried.
    pub async fn issue(&self, res: &mut Response) -> Result<Token> {
        let token = self.store.issue().await?;
        self.injector.inject(&token, res)?;
        Ok(token)
    }
}

/// The nonce middleware. Cheap to clone; clones share one store.
///
/// Dropping the last clone stops the sweeper. The store worker stops once
/// in-flight requests holding a [`NonceContext`] finish as well.
#[derive(Clone)]
pub struct NonceGuard {
    inner: Arc<Inner>,
}

struct Inner {
    store: NonceStore,
    extractor: Arc<dyn Extractor>,
    injector: Arc<dyn Injector>,
    _sweeper: Sweeper,
}

impl NonceGuard {
    /// Spawns the store worker and the sweeper.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn new(config: NonceConfig) -> Self {
        let store = NonceStore::spawn(config.generator, config.clock, config.age);
        let sweeper = Sweeper::spawn(store.clone(), config.sweep_interval, config.age);

        Self {
            inner: Arc::new(Inner {
                store,
                extractor: config.extractor,
                injector: config.injector,
                _sweeper: sweeper,
            }),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &NonceStore {
        &self.inner.store
    }

    /// Checks the request's inbound nonce and attaches a [`NonceContext`].
    pub async fn screen(&self, req: &mut Request) {
        let verdict = match self.inner.extractor.extract(req) {
            Some(token) => {
                if self.inner.store.validate_and_consume(&token).await {
                    Verdict::Valid
                } else {
                    Verdict::Invalid
                }
            }
            None => Verdict::NotPresented,
        };
        debug!(?verdict, path = %req.path(), "nonce screened");

        req.nonce = Some(NonceContext {
            verdict,
            store: self.inner.store.clone(),
            injector: Arc::clone(&self.inner.injector),
        });
    }

    /// Wraps `handler` so every request is screened before it runs.
    pub fn layer(&self, handler: impl Handler) -> Layered<Self> {
        Layered::new(self.clone(), handler)
    }
}

impl Layer for NonceGuard {
    fn before(&self, req: &mut Request) -> impl Future<Output = ()> + Send {
        self.screen(req)
    }
}

#[cfg(test)]
mod tests {
    use http::Method;
    use http::header::{HeaderName, HeaderValue};

    use super::*;
    use crate::handler::ErasedHandler;

    fn with_nonce(token: &str) -> Request {
        Request::new(Method::POST, "/submit")
            .with_header(HeaderName::from_static(NONCE_HEADER), HeaderValue::from_str(token).unwrap())
    }

    #[tokio::test]
    async fn screen_records_each_verdict() {
        let guard = NonceGuard::new(NonceConfig::default());

        let mut req = Request::new(Method::GET, "/");
        guard.screen(&mut req).await;
        assert_eq!(req.nonce_verdict(), Verdict::NotPresented);

        let token = guard.store().issue().await.unwrap();
        let mut req = with_nonce(token.as_str());
        guard.screen(&mut req).await;
        assert_eq!(req.nonce_verdict(), Verdict::Valid);

        let mut replay = with_nonce(token.as_str());
        guard.screen(&mut replay).await;
        assert_eq!(replay.nonce_verdict(), Verdict::Invalid);
    }

    #[tokio::test]
    async fn expired_nonce_is_invalid() {
        let clock = ManualClock::new(10_000);
        let guard = NonceGuard::new(NonceConfig::default().with_clock(clock.clone()));
        let token = guard.store().issue().await.unwrap();

        clock.advance(DEFAULT_AGE + std::time::Duration::from_secs(1));
        let mut req = with_nonce(token.as_str());
        guard.screen(&mut req).await;
        assert_eq!(req.nonce_verdict(), Verdict::Invalid);
        assert_eq!(guard.store().len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn context_issue_injects_header() {
        let guard = NonceGuard::new(NonceConfig::default());
        let mut req = Request::new(Method::GET, "/");
        guard.screen(&mut req).await;

        let mut res = Response::text("form");
        let token = req.issue_nonce(&mut res).await.unwrap().unwrap();
        assert_eq!(res.header("x-nonce"), Some(token.as_str()));
        assert_eq!(guard.store().len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn layer_screens_before_the_handler() {
        let guard = NonceGuard::new(NonceConfig::default());
        let token = guard.store().issue().await.unwrap();

        let handler = guard
            .layer(|req: Request| async move { format!("{:?}", req.nonce_verdict()) })
            .into_boxed_handler();
        let res = handler.call(with_nonce(token.as_str())).await;
        assert_eq!(res.body(), b"Valid");

        let res = handler.call(with_nonce(token.as_str())).await;
        assert_eq!(res.body(), b"Invalid");
    }

    #[test]
    fn only_valid_is_valid() {
        assert!(Verdict::Valid.is_valid());
        assert!(!Verdict::Invalid.is_valid());
        assert!(!Verdict::NotPresented.is_valid());
    }
}
