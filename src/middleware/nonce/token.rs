//! Tokens and the generators that seed them.
//!
//! A generator writes unpredictable bytes into a sink; the store feeds that
//! sink into SHA-256 and uses the hex digest as the token. Swapping the
//! generator changes where the entropy comes from, never the token shape.

use std::fmt;
use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// A single-use nonce: the lowercase hex SHA-256 digest of generator output.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Token(String);

impl Token {
    pub fn as_str(&self) -> &str { &self.0 }

    pub fn into_string(self) -> String { self.0 }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str { &self.0 }
}

/// Source of entropy for new tokens.
///
/// Implemented for any `Fn(&mut dyn Write) -> io::Result<()>`, so a closure
/// can stand in for a custom generator.
pub trait Generator: Send + Sync + 'static {
    /// Writes seed bytes into `sink`.
    ///
    /// # Errors
    ///
    /// Returns the sink's write error unchanged.
    fn generate(&self, sink: &mut dyn Write) -> io::Result<()>;
}

impl<F> Generator for F
where
    F: Fn(&mut dyn Write) -> io::Result<()> + Send + Sync + 'static,
{
    fn generate(&self, sink: &mut dyn Write) -> io::Result<()> {
        self(sink)
    }
}

/// The default generator: current Unix seconds followed by a random 63-bit
/// integer, both written in base 32.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimeRandomGenerator;

impl Generator for TimeRandomGenerator {
    fn generate(&self, sink: &mut dyn Write) -> io::Result<()> {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        let random = rand::random::<u64>() >> 1;

        for part in [radix32(secs), radix32(random)] {
            sink.write_all(part.as_bytes())?;
        }
        Ok(())
    }
}

/// Writes 32 bytes from the operating system's CSPRNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsRandomGenerator;

impl Generator for OsRandomGenerator {
    fn generate(&self, sink: &mut dyn Write) -> io::Result<()> {
        let mut seed = [0u8; 32];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(io::Error::other)?;
        sink.write_all(&seed)
    }
}

/// Runs `generator` into a fresh SHA-256 sink and hex-encodes the digest.
pub(crate) fn mint(generator: &dyn Generator) -> Result<Token> {
    let mut hasher = Sha256::new();
    generator.generate(&mut hasher).map_err(Error::Generation)?;
    Ok(Token(hex::encode(hasher.finalize())))
}

/// Formats `n` in base 32 using the digits `0-9a-v`.
fn radix32(mut n: u64) -> String {
    const DIGITS: &[u8; 32] = b"0123456789abcdefghijklmnopqrstuv";

    if n == 0 {
        return "0".to_owned();
    }
    let mut buf = Vec::with_capacity(13);
    while n > 0 {
        buf.push(DIGITS[(n % 32) as usize]);
        n /= 32;
    }
    buf.reverse();
    buf.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radix32_matches_known_values() {
        assert_eq!(radix32(0), "0");
        assert_eq!(radix32(31), "v");
        assert_eq!(radix32(32), "10");
        assert_eq!(radix32(1_700_000_000), "1il7s80");
    }

    #[test]
    fn minted_token_is_hex_sha256() {
        let token = mint(&TimeRandomGenerator).unwrap();
        assert_eq!(token.as_str().len(), 64);
        assert!(token.as_str().chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn fixed_seed_gives_fixed_token() {
        let fixed = |sink: &mut dyn Write| sink.write_all(b"seed");
        let a = mint(&fixed).unwrap();
        let b = mint(&fixed).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), hex::encode(Sha256::digest(b"seed")));
    }

    #[test]
    fn generator_failure_is_generation_error() {
        let broken = |_: &mut dyn Write| Err::<(), _>(io::Error::other("no entropy"));
        assert!(matches!(mint(&broken), Err(Error::Generation(_))));
    }

    #[test]
    fn os_random_tokens_differ() {
        let a = mint(&OsRandomGenerator).unwrap();
        let b = mint(&OsRandomGenerator).unwrap();
        assert_ne!(a, b);
    }
}
