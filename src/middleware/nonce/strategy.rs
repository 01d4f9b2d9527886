//! Where a nonce travels: extraction from requests, injection into responses.

use http::header::{HeaderName, HeaderValue};

use super::token::Token;
use crate::error::Result;
use crate::request::Request;
use crate::response::Response;

/// Default header carrying the nonce in both directions.
pub const NONCE_HEADER: &str = "x-nonce";

/// Reads an inbound nonce from a request.
///
/// Implemented for any `Fn(&Request) -> Option<String>`.
pub trait Extractor: Send + Sync + 'static {
    /// The presented token, or `None` if the request carries none.
    fn extract(&self, req: &Request) -> Option<String>;
}

impl<F> Extractor for F
where
    F: Fn(&Request) -> Option<String> + Send + Sync + 'static,
{
    fn extract(&self, req: &Request) -> Option<String> {
        self(req)
    }
}

/// Writes an outbound nonce into a response.
///
/// Implemented for any `Fn(&Token, &mut Response) -> Result<()>`.
pub trait Injector: Send + Sync + 'static {
    /// # Errors
    ///
    /// Returns an error if the token cannot be represented in the response.
    fn inject(&self, token: &Token, res: &mut Response) -> Result<()>;
}

impl<F> Injector for F
where
    F: Fn(&Token, &mut Response) -> Result<()> + Send + Sync + 'static,
{
    fn inject(&self, token: &Token, res: &mut Response) -> Result<()> {
        self(token, res)
    }
}

/// Carries the nonce in a single header, `X-Nonce` by default.
///
/// The header name is matched case-insensitively; the value is used as-is.
/// An empty value counts as no nonce.
#[derive(Clone, Debug)]
pub struct HeaderStrategy {
    name: HeaderName,
}

impl HeaderStrategy {
    pub fn new(name: HeaderName) -> Self {
        Self { name }
    }
}

impl Default for HeaderStrategy {
    fn default() -> Self {
        Self::new(HeaderName::from_static(NONCE_HEADER))
    }
}

impl Extractor for HeaderStrategy {
    fn extract(&self, req: &Request) -> Option<String> {
        let value = req.headers().get(&self.name)?.to_str().ok()?;
        (!value.is_empty()).then(|| value.to_owned())
    }
}

impl Injector for HeaderStrategy {
    fn inject(&self, token: &Token, res: &mut Response) -> Result<()> {
        res.set_header(self.name.clone(), HeaderValue::from_str(token.as_str())?);
        Ok(())
    }
}
