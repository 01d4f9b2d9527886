//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use http_body_util::BodyExt;

use crate::error::Result;
use crate::middleware::nonce::{NonceContext, Token, Verdict};
use crate::response::Response;

/// An incoming HTTP request.
///
/// Besides the usual method, path, headers, and body, a request carries the
/// request-scoped nonce context when it has passed through a
/// [`NonceGuard`](crate::middleware::nonce::NonceGuard) layer.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) nonce: Option<NonceContext>,
}

impl Request {
    /// Creates a request with no headers and an empty body.
    ///
    /// The server builds requests from the wire; this constructor is for
    /// embedding the router in-process and for tests.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            params: HashMap::new(),
            nonce: None,
        }
    }

    /// Appends a header. Returns `self` for chaining.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replaces the body. Returns `self` for chaining.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Collects the hyper body and converts the request.
    pub(crate) async fn from_hyper(
        req: hyper::Request<hyper::body::Incoming>,
    ) -> std::result::Result<Self, hyper::Error> {
        let (parts, body) = req.into_parts();
        let body = body.collect().await?.to_bytes();
        Ok(Self {
            method: parts.method,
            path: parts.uri.path().to_owned(),
            headers: parts.headers,
            body,
            params: HashMap::new(),
            nonce: None,
        })
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup. Values that are not visible ASCII
    /// are treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// The nonce context attached by an upstream guard, if any.
    pub fn nonce(&self) -> Option<&NonceContext> {
        self.nonce.as_ref()
    }

    /// The verdict recorded for this request's inbound nonce.
    ///
    /// [`Verdict::NotPresented`] when the request carried no nonce or no
    /// guard sits upstream of the handler.
    pub fn nonce_verdict(&self) -> Verdict {
        self.nonce.as_ref().map_or(Verdict::NotPresented, NonceContext::verdict)
    }

    /// Issues a fresh nonce and injects it into `response`.
    ///
    /// Returns `Ok(None)` when no guard sits upstream of the handler.
    ///
    /// # Errors
    ///
    /// Fails when the generator cannot produce a token or the injector
    /// cannot write it. Nothing is retried.
    pub async fn issue_nonce(&self, response: &mut Response) -> Result<Option<Token>> {
        match &self.nonce {
            Some(ctx) => ctx.issue(response).await.map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_name_case() {
        let req = Request::new(Method::GET, "/")
            .with_header(HeaderName::from_static("x-nonce"), HeaderValue::from_static("abc"));

        assert_eq!(req.header("X-Nonce"), Some("abc"));
        assert_eq!(req.header("x-nonce"), Some("abc"));
        assert_eq!(req.header("x-other"), None);
    }

    #[test]
    fn unguarded_request_has_no_verdict() {
        let req = Request::new(Method::GET, "/");
        assert!(req.nonce().is_none());
        assert_eq!(req.nonce_verdict(), Verdict::NotPresented);
    }

    #[tokio::test]
    async fn unguarded_request_issues_nothing() {
        let req = Request::new(Method::POST, "/form");
        let mut res = Response::text("ok");

        let issued = req.issue_nonce(&mut res).await.unwrap();
        assert!(issued.is_none());
        assert!(res.header("x-nonce").is_none());
    }
}
