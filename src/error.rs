//! Unified error type.

use thiserror::Error;

/// The error type returned by nonceguard's fallible operations.
///
/// A missing, unknown, or expired nonce is not an error: it is recorded as
/// [`Verdict::Invalid`](crate::middleware::nonce::Verdict::Invalid). This
/// type surfaces failures to mint a token and infrastructure failures
/// (binding to a port, accepting a connection).
#[derive(Debug, Error)]
pub enum Error {
    /// The generator failed to write entropy into the digest sink.
    #[error("nonce generation: {0}")]
    Generation(#[source] std::io::Error),

    /// The store worker has stopped and can no longer answer requests.
    #[error("nonce store closed")]
    StoreClosed,

    /// A token could not be encoded as a header value.
    #[error("invalid header value: {0}")]
    HeaderValue(#[from] http::header::InvalidHeaderValue),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for results in this crate.
pub type Result<T> = std::result::Result<T, Error>;
