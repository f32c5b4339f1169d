//! Environment abstraction for deterministic testing.
//!
//! Decouples ledger and client logic from system resources (time,
//! randomness). The ledger reads both clocks; the client's keyring draws its
//! salts and nonces from `random_bytes`. Enables deterministic simulation
//! (virtual clock, seeded RNG) and production use with real system resources.

use std::time::Duration;

/// Abstract environment providing time and randomness.
///
/// # Safety
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - `random_bytes()` uses cryptographically secure entropy in production
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`, while simulation
    /// environments use virtual time.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    ///
    /// # Invariants
    ///
    /// - Subsequent calls must return times >= previous calls.
    fn now(&self) -> Self::Instant;

    /// Fills the provided buffer with random bytes.
    ///
    /// # Invariants
    ///
    /// - Given the same RNG seed, this produces the same sequence of bytes
    /// - Uses cryptographically secure RNG
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Wall-clock time as seconds since the Unix epoch.
    ///
    /// Used to stamp finalized writes. Returns `None` when the clock cannot
    /// be resolved (e.g. set before 1970); callers record that as an explicit
    /// unresolved timestamp rather than zero.
    fn wall_clock_secs(&self) -> Option<u64>;
}
