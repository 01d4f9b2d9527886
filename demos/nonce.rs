//! Nonce-protected form submission.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example nonce
//!
//! Try:
//!   curl -i http://localhost:3000/transfer            # note the x-nonce header
//!   curl -i -X POST http://localhost:3000/transfer \
//!        -H "x-nonce: <value from above>"             # 200 the first time
//!   # the same command again                         # 403: already used
//!   curl http://localhost:3000/healthz

use std::time::Duration;

use http::{Method, StatusCode};
use nonceguard::middleware::nonce::{NonceConfig, NonceGuard, OsRandomGenerator, Verdict};
use nonceguard::{Request, Response, Router, Server};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let guard = NonceGuard::new(
        NonceConfig::default()
            .with_generator(OsRandomGenerator)
            .with_age(Duration::from_secs(60))
            .with_sweep_interval(Duration::from_secs(30)),
    );

    let app = Router::new()
        .on(Method::GET,  "/transfer", guard.layer(start_transfer))
        .on(Method::POST, "/transfer", guard.layer(commit_transfer))
        .on(Method::GET,  "/healthz",  healthz);

    if let Err(e) = Server::bind(([0, 0, 0, 0], 3000)).serve(app).await {
        tracing::error!("server error: {e}");
    }
}

// GET /transfer → 204 with a fresh x-nonce header
async fn start_transfer(req: Request) -> Response {
    let mut res = Response::status(StatusCode::NO_CONTENT);
    match req.issue_nonce(&mut res).await {
        Ok(_) => res,
        Err(e) => {
            tracing::error!("could not issue nonce: {e}");
            Response::status(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

// POST /transfer → 200 exactly once per issued nonce
async fn commit_transfer(req: Request) -> Response {
    match req.nonce_verdict() {
        Verdict::Valid => Response::json(br#"{"status":"committed"}"#.to_vec()),
        Verdict::Invalid => Response::status(StatusCode::FORBIDDEN),
        Verdict::NotPresented => Response::builder()
            .status(StatusCode::BAD_REQUEST)
            .text("missing x-nonce"),
    }
}

async fn healthz(_req: Request) -> &'static str {
    "ok"
}
