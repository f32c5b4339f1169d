//! Production Environment implementation using system time and RNG.
//!
//! Real monotonic time, OS cryptographic randomness (getrandom) and the
//! system wall clock. Not reproducible; simulations use a seeded environment.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use inkvault_core::Environment;

/// Production environment using system time and cryptographic RNG.
///
/// # Panics
///
/// Panics if the OS RNG fails. A ledger without functioning cryptographic
/// randomness cannot operate securely.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }

    #[allow(clippy::disallowed_methods)]
    fn wall_clock_secs(&self) -> Option<u64> {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => Some(elapsed.as_secs()),
            Err(e) => {
                tracing::warn!(error = %e, "System clock is before the Unix epoch");
                None
            },
        }
    }
}
