//! Guard configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::clock::{Clock, SystemClock};
use super::strategy::{Extractor, HeaderStrategy, Injector};
use super::token::{Generator, TimeRandomGenerator};

/// Default maximum nonce age.
pub const DEFAULT_AGE: Duration = Duration::from_secs(45);

/// Default period between expiry sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Everything a [`NonceGuard`](super::NonceGuard) needs, fixed at
/// construction.
///
/// ```rust
/// use std::time::Duration;
/// use nonceguard::middleware::nonce::{NonceConfig, OsRandomGenerator};
///
/// let config = NonceConfig::default()
///     .with_age(Duration::from_secs(120))
///     .with_generator(OsRandomGenerator);
/// assert_eq!(config.age, Duration::from_secs(120));
/// ```
#[derive(Clone)]
pub struct NonceConfig {
    pub generator: Arc<dyn Generator>,
    pub extractor: Arc<dyn Extractor>,
    pub injector: Arc<dyn Injector>,
    pub clock: Arc<dyn Clock>,
    /// Maximum age of a nonce, used both for validation and sweeping.
    pub age: Duration,
    /// Period between sweeps. Independent of `age`; zero means the default.
    pub sweep_interval: Duration,
}

impl NonceConfig {
    /// Replaces the token seed source.
    pub fn with_generator(mut self, generator: impl Generator) -> Self {
        self.generator = Arc::new(generator);
        self
    }

    /// Replaces how inbound nonces are read from requests.
    pub fn with_extractor(mut self, extractor: impl Extractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    /// Replaces how issued nonces are written into responses.
    pub fn with_injector(mut self, injector: impl Injector) -> Self {
        self.injector = Arc::new(injector);
        self
    }

    /// Replaces the time source used for ages.
    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Sets the maximum nonce age.
    pub fn with_age(mut self, age: Duration) -> Self {
        self.age = age;
        self
    }

    /// Sets the period between expiry sweeps. Zero falls back to the default.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

impl Default for NonceConfig {
    fn default() -> Self {
        let header = Arc::new(HeaderStrategy::default());
        Self {
            generator: Arc::new(TimeRandomGenerator),
            extractor: header.clone(),
            injector: header,
            clock: Arc::new(SystemClock),
            age: DEFAULT_AGE,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl fmt::Debug for NonceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NonceConfig")
            .field("age", &self.age)
            .field("sweep_interval", &self.sweep_interval)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = NonceConfig::default();
        assert_eq!(config.age, Duration::from_secs(45));
        assert_eq!(config.sweep_interval, Duration::from_secs(300));
    }

    #[test]
    fn setters_override_defaults() {
        let config = NonceConfig::default()
            .with_age(Duration::from_secs(10))
            .with_sweep_interval(Duration::from_secs(30));
        assert_eq!(config.age, Duration::from_secs(10));
        assert_eq!(config.sweep_interval, Duration::from_secs(30));
    }

    #[test]
    fn debug_hides_collaborators() {
        let out = format!("{:?}", NonceConfig::default());
        assert!(out.contains("age: 45s"));
        assert!(out.ends_with(".. }"));
    }
}
