//! Radix-tree request router.
//!
//! One tree per HTTP method. O(path-length) lookup. Middleware is applied
//! per handler before registration (see [`NonceGuard::layer`]), so the
//! router itself stays a plain path → handler table.
//!
//! [`NonceGuard::layer`]: crate::middleware::nonce::NonceGuard::layer

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve)
/// or call [`Router::handle`] directly to dispatch in-process.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new() }
    }

    /// Register a handler for a method + path pair. Returns `self` for chaining.
    ///
    /// Path parameters use `{name}` syntax — `req.param("name")` retrieves them:
    ///
    /// ```rust,no_run
    /// # use nonceguard::{Request, Response, Router};
    /// # use http::Method;
    /// # async fn get_user(_: Request) -> Response { Response::text("") }
    /// # async fn create_user(_: Request) -> Response { Response::text("") }
    /// Router::new()
    ///     .on(Method::GET,  "/users/{id}", get_user)
    ///     .on(Method::POST, "/users",      create_user);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for the same method. Routes are fixed at startup.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Routes one request and produces one response. Unmatched requests get
    /// `404 Not Found`.
    pub async fn handle(&self, mut req: Request) -> Response {
        match self.lookup(&req.method, &req.path) {
            Some((handler, params)) => {
                req.params = params;
                handler.call(req).await
            }
            None => Response::status(StatusCode::NOT_FOUND),
        }
    }

    fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
