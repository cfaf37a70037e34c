// src/crypto/rng.rs
//! Randomness for nonces and padding
//!
//! The handshake draws every nonce through the [`RandomSource`] trait so that a
//! session can be driven by the operating system RNG in production and by a
//! fixed-output source in tests.
//!
//! [`SystemRandom`] wraps `OsRng`. If the OS RNG fails it either produces a
//! fully deterministic byte sequence ([`FallbackPolicy::Deterministic`], the
//! drive-compatible behaviour) or returns an error
//! ([`FallbackPolicy::FailClosed`]). Every fallback is logged at `warn` level
//! and counted.

use crate::error::SacdError;
use log::warn;
use rand::rngs::OsRng;
use rand::TryRngCore;
use secure_gate::Fixed;

/// A source of random bytes for the handshake.
pub trait RandomSource {
    /// Fill `dest` completely or fail.
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), SacdError>;
}

impl<T: RandomSource + ?Sized> RandomSource for &mut T {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), SacdError> {
        (**self).fill(dest)
    }
}

impl<T: RandomSource + ?Sized> RandomSource for Box<T> {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), SacdError> {
        (**self).fill(dest)
    }
}

/// What [`SystemRandom`] does when the OS RNG reports an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Emit a deterministic byte sequence and carry on.
    #[default]
    Deterministic,
    /// Return [`SacdError::CryptoFailed`].
    FailClosed,
}

/// OS-backed random source with an explicit failure policy.
#[derive(Debug)]
pub struct SystemRandom<R = OsRng> {
    rng: R,
    policy: FallbackPolicy,
    fallback_position: u64,
    fallback_events: u64,
}

impl SystemRandom<OsRng> {
    #[inline]
    pub fn new() -> Self {
        Self::with_rng(OsRng)
    }
}

impl Default for SystemRandom<OsRng> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<R: TryRngCore> SystemRandom<R> {
    /// Wrap any fallible RNG (tests use this to inject failures).
    pub fn with_rng(rng: R) -> Self {
        Self {
            rng,
            policy: FallbackPolicy::default(),
            fallback_position: 0,
            fallback_events: 0,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: FallbackPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub const fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// Number of fills served by the deterministic fallback so far.
    pub const fn fallback_events(&self) -> u64 {
        self.fallback_events
    }

    fn fill_deterministic(&mut self, dest: &mut [u8]) {
        for byte in dest.iter_mut() {
            let p = self.fallback_position;
            *byte = (p.wrapping_mul(0x6D).wrapping_add(0x3B) ^ (p >> 8)) as u8;
            self.fallback_position = p.wrapping_add(1);
        }
    }
}

impl<R: TryRngCore> RandomSource for SystemRandom<R> {
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), SacdError> {
        match self.rng.try_fill_bytes(dest) {
            Ok(()) => Ok(()),
            Err(e) => match self.policy {
                FallbackPolicy::FailClosed => Err(SacdError::CryptoFailed(format!(
                    "secure random source unavailable: {e}"
                ))),
                FallbackPolicy::Deterministic => {
                    self.fallback_events += 1;
                    warn!(
                        "secure random source unavailable ({e}); using deterministic fallback for {} bytes",
                        dest.len()
                    );
                    self.fill_deterministic(dest);
                    Ok(())
                }
            },
        }
    }
}

/// Fill `dest` from a fresh [`SystemRandom`] with the default policy.
pub fn random_bytes(dest: &mut [u8]) -> Result<(), SacdError> {
    SystemRandom::new().fill(dest)
}

/// Fill `dest` with bytes that are all non-zero (PKCS#1 type-2 padding).
///
/// Zero bytes are redrawn; a source that keeps returning zeros fails after a
/// bounded number of attempts.
pub fn fill_nonzero<S: RandomSource + ?Sized>(
    rng: &mut S,
    dest: &mut [u8],
) -> Result<(), SacdError> {
    const MAX_REDRAWS: usize = 64;

    rng.fill(dest)?;
    let mut byte = [0u8; 1];
    for slot in dest.iter_mut().filter(|b| **b == 0) {
        let mut attempts = 0;
        while byte[0] == 0 {
            if attempts == MAX_REDRAWS {
                return Err(SacdError::CryptoFailed(
                    "random source keeps returning zero bytes".into(),
                ));
            }
            rng.fill(&mut byte)?;
            attempts += 1;
        }
        *slot = byte[0];
        byte[0] = 0;
    }
    Ok(())
}

/// Gives `random_from()` to every fixed-size secret type.
pub trait SecureRandomExt: Sized {
    fn random_from<S: RandomSource + ?Sized>(rng: &mut S) -> Result<Self, SacdError>;
}

impl<const N: usize> SecureRandomExt for Fixed<[u8; N]> {
    #[inline]
    fn random_from<S: RandomSource + ?Sized>(rng: &mut S) -> Result<Self, SacdError> {
        let mut secret = Fixed::new([0u8; N]);
        rng.fill(secret.expose_secret_mut())?;
        Ok(secret)
    }
}
