//! Middleware layer.
//!
//! Middleware wraps a handler before it is registered on the router and
//! runs on every request that reaches that handler. It is the place for
//! cross-cutting request checks that must happen before application code
//! sees the request.
//!
//! Built-in middleware:
//! - [`nonce`] — single-use anti-replay tokens with a per-request verdict

pub mod nonce;
