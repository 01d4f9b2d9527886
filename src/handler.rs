//! Handler trait and type erasure.
//!
//! The router stores handlers of different concrete types side by side, and
//! middleware such as the nonce guard wraps one handler inside another. Both
//! need a uniform shape, so every handler is erased to
//! `Arc<dyn ErasedHandler>`:
//!
//! ```text
//! async fn submit(req: Request) -> Response { … }   ← user writes this
//!        ↓ guard.layer(submit)                       ← Layered { layer, next }
//!        ↓ router.on(Method::POST, "/submit", …)
//! handler.into_boxed_handler()                       ← Arc<dyn ErasedHandler>
//!        ↓
//! layer.before(&mut req) then next.call(req)         ← at request time
//! ```
//!
//! A [`Layer`] only sees the request on its way in. It can annotate the
//! request (the nonce guard attaches its verdict) but never short-circuits
//! the handler it wraps.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// A heap-allocated, type-erased future that resolves to a [`Response`].
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Internal dispatch interface.
///
/// `#[doc(hidden)] pub` rather than `pub(crate)` because it appears in the
/// return type of the public `Handler` trait's `into_boxed_handler` method.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// Automatically satisfied for any `async fn` (or closure) with the shape:
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// Sealed: only the impls in this module can satisfy it, the blanket one
/// for functions and the one for [`Layered`] handlers.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

// ── Blanket implementations ───────────────────────────────────────────────────

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

// ── Middleware ────────────────────────────────────────────────────────────────

/// A step that runs on every request before the wrapped handler.
pub trait Layer: Send + Sync + 'static {
    /// Inspects or annotates `req` before the wrapped handler sees it.
    fn before(&self, req: &mut Request) -> impl Future<Output = ()> + Send;
}

/// A handler wrapped in a [`Layer`]. Register it like any other handler.
pub struct Layered<L> {
    layer: Arc<L>,
    next: BoxedHandler,
}

impl<L: Layer> Layered<L> {
    pub fn new(layer: L, handler: impl Handler) -> Self {
        Self { layer: Arc::new(layer), next: handler.into_boxed_handler() }
    }
}

impl<L: Layer> private::Sealed for Layered<L> {}

impl<L: Layer> Handler for Layered<L> {
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(self)
    }
}

impl<L: Layer> ErasedHandler for Layered<L> {
    fn call(&self, mut req: Request) -> BoxFuture {
        let layer = Arc::clone(&self.layer);
        let next = Arc::clone(&self.next);
        Box::pin(async move {
            layer.before(&mut req).await;
            next.call(req).await
        })
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Bridges a concrete handler `F` to the [`ErasedHandler`] trait object.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};

    async fn teapot(_req: Request) -> StatusCode {
        StatusCode::IM_A_TEAPOT
    }

    struct Stamp(&'static str);

    impl Layer for Stamp {
        async fn before(&self, req: &mut Request) {
            req.headers.append("x-stamp", http::HeaderValue::from_static(self.0));
        }
    }

    async fn stamps(req: Request) -> String {
        req.headers()
            .get_all("x-stamp")
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect::<Vec<_>>()
            .join(",")
    }

    #[tokio::test]
    async fn layers_run_outermost_first() {
        let handler = Layered::new(Stamp("outer"), Layered::new(Stamp("inner"), stamps));
        let res = handler.into_boxed_handler().call(Request::new(Method::GET, "/")).await;
        assert_eq!(res.body(), b"outer,inner");
    }

    #[tokio::test]
    async fn erased_handler_converts_output() {
        let handler = teapot.into_boxed_handler();
        let res = handler.call(Request::new(Method::GET, "/")).await;
        assert_eq!(res.status_code(), StatusCode::IM_A_TEAPOT);
    }
}
