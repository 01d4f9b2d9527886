//! The token store actor.
//!
//! One spawned worker owns the token → issued-at map. Callers never touch
//! the map: they send a [`Command`] over an unbounded mailbox together with
//! a one-shot reply sender, then await the reply. The worker runs each
//! command to completion before receiving the next, so issue, consume, and
//! sweep never interleave.
//!
//! ```text
//! request task ──Command──▶ mailbox ──▶ worker (owns Ledger)
//!      ▲                                   │
//!      └──────────── oneshot reply ◀───────┘
//! ```

use std::collections::HashMap;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::clock::{Clock, secs};
use super::token::{Generator, Token, mint};
use crate::error::{Error, Result};

enum Command {
    Issue { reply: oneshot::Sender<Result<Token>> },
    Consume { token: String, reply: oneshot::Sender<bool> },
    Sweep { ttl: Duration, reply: oneshot::Sender<usize> },
    Len { reply: oneshot::Sender<usize> },
}

/// State owned by the worker.
struct Ledger {
    entries: HashMap<String, i64>,
    generator: Arc<dyn Generator>,
    clock: Arc<dyn Clock>,
    ttl: i64,
}

impl Ledger {
    /// A panicking generator is reported as [`Error::Generation`]; the
    /// worker, and every token it holds, survives it.
    fn issue(&mut self) -> Result<Token> {
        let generator = self.generator.as_ref();
        let token = panic::catch_unwind(AssertUnwindSafe(|| mint(generator)))
            .map_err(|_| Error::Generation(io::Error::other("generator panicked")))??;
        self.entries.insert(token.as_str().to_owned(), self.clock.now());
        Ok(token)
    }

    /// Removes `token` whether or not it is still fresh; only a fresh one
    /// counts as valid.
    fn consume(&mut self, token: &str) -> bool {
        match self.entries.remove(token) {
            Some(issued_at) => self.clock.now() - issued_at <= self.ttl,
            None => false,
        }
    }

    fn sweep(&mut self, ttl: i64) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, issued_at| now - *issued_at <= ttl);
        before - self.entries.len()
    }

    fn apply(&mut self, cmd: Command) {
        match cmd {
            Command::Issue { reply } => {
                let res = self.issue();
                match &res {
                    Ok(_) => debug!(live = self.entries.len(), "nonce issued"),
                    Err(e) => error!(error = %e, "nonce generation failed"),
                }
                let _ = reply.send(res);
            }
            Command::Consume { token, reply } => {
                let valid = self.consume(&token);
                debug!(valid, live = self.entries.len(), "nonce presented");
                let _ = reply.send(valid);
            }
            Command::Sweep { ttl, reply } => {
                let removed = self.sweep(secs(ttl));
                if removed > 0 {
                    info!(removed, live = self.entries.len(), "swept expired nonces");
                }
                let _ = reply.send(removed);
            }
            Command::Len { reply } => {
                let _ = reply.send(self.entries.len());
            }
        }
    }
}

/// Handle to the token store worker. Clones share the same worker.
///
/// The worker stops once every handle has been dropped.
#[derive(Clone)]
pub struct NonceStore {
    tx: mpsc::UnboundedSender<Command>,
}

impl NonceStore {
    /// Spawns the worker on the current tokio runtime.
    ///
    /// `ttl` is the age limit applied by
    /// [`validate_and_consume`](Self::validate_and_consume).
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn(generator: Arc<dyn Generator>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut ledger = Ledger {
            entries: HashMap::new(),
            generator,
            clock,
            ttl: secs(ttl),
        };

        tokio::spawn(async move {
            while let Some(cmd) = rx.recv().await {
                ledger.apply(cmd);
            }
            debug!("nonce store stopped");
        });

        Self { tx }
    }

    /// Mints a token and records it as issued now.
    ///
    /// # Errors
    ///
    /// [`Error::Generation`] if the generator fails, [`Error::StoreClosed`]
    /// if the worker is gone.
    pub async fn issue(&self) -> Result<Token> {
        self.request(|reply| Command::Issue { reply }).await?
    }

    /// Consumes `token`. Returns `true` only if it was live and no older
    /// than the store's TTL. A matching entry is removed either way, so a
    /// second presentation always fails.
    pub async fn validate_and_consume(&self, token: &str) -> bool {
        let token = token.to_owned();
        match self.request(|reply| Command::Consume { token, reply }).await {
            Ok(valid) => valid,
            Err(e) => {
                warn!(error = %e, "nonce validation skipped");
                false
            }
        }
    }

    /// Removes every entry older than `ttl` and returns how many went.
    ///
    /// # Errors
    ///
    /// [`Error::StoreClosed`] if the worker is gone.
    pub async fn sweep(&self, ttl: Duration) -> Result<usize> {
        self.request(|reply| Command::Sweep { ttl, reply }).await
    }

    /// Number of live entries.
    ///
    /// # Errors
    ///
    /// [`Error::StoreClosed`] if the worker is gone.
    pub async fn len(&self) -> Result<usize> {
        self.request(|reply| Command::Len { reply }).await
    }

    async fn request<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(build(reply)).map_err(|_| Error::StoreClosed)?;
        rx.await.map_err(|_| Error::StoreClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::nonce::clock::ManualClock;
    use crate::middleware::nonce::token::TimeRandomGenerator;

    fn ledger(clock: &ManualClock, ttl: i64) -> Ledger {
        Ledger {
            entries: HashMap::new(),
            generator: Arc::new(TimeRandomGenerator),
            clock: Arc::new(clock.clone()),
            ttl,
        }
    }

    #[test]
    fn consume_accepts_token_exactly_at_ttl() {
        let clock = ManualClock::new(1_000);
        let mut ledger = ledger(&clock, 45);
        let token = ledger.issue().unwrap();

        clock.advance(Duration::from_secs(45));
        assert!(ledger.consume(token.as_str()));
        assert!(!ledger.consume(token.as_str()));
    }

    #[test]
    fn consume_removes_expired_token() {
        let clock = ManualClock::new(1_000);
        let mut ledger = ledger(&clock, 45);
        let token = ledger.issue().unwrap();

        clock.advance(Duration::from_secs(46));
        assert!(!ledger.consume(token.as_str()));
        assert!(ledger.entries.is_empty());
    }

    #[test]
    fn sweep_removes_every_stale_entry() {
        let clock = ManualClock::new(1_000);
        let mut ledger = ledger(&clock, 45);
        for _ in 0..3 {
            ledger.issue().unwrap();
        }
        clock.set(1_030);
        for _ in 0..4 {
            ledger.issue().unwrap();
        }

        clock.set(1_050);
        assert_eq!(ledger.sweep(45), 3);
        assert_eq!(ledger.entries.len(), 4);
        assert!(ledger.entries.values().all(|&t| t == 1_030));
    }

    #[tokio::test]
    async fn panicking_generator_leaves_worker_running() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let calls = AtomicUsize::new(0);
        let generator = move |sink: &mut dyn io::Write| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n == 1 {
                panic!("entropy source gone");
            }
            write!(sink, "seed-{n}")
        };
        let clock = ManualClock::new(1_000);
        let store = NonceStore::spawn(Arc::new(generator), Arc::new(clock), Duration::from_secs(45));

        let first = store.issue().await.unwrap();
        assert!(matches!(store.issue().await, Err(Error::Generation(_))));

        assert_eq!(store.len().await.unwrap(), 1);
        assert!(store.validate_and_consume(first.as_str()).await);
        assert!(store.issue().await.is_ok());
    }

    #[tokio::test]
    async fn closed_store_degrades() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let store = NonceStore { tx };

        assert!(!store.validate_and_consume("anything").await);
        assert!(matches!(store.issue().await, Err(Error::StoreClosed)));
        assert!(matches!(store.sweep(Duration::from_secs(1)).await, Err(Error::StoreClosed)));
    }
}
