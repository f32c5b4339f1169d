//! Seeded simulation environment.
//!
//! Virtual monotonic clock, virtual wall clock and a ChaCha RNG, all shared
//! between clones so every component of one simulation sees the same world.

#![allow(clippy::disallowed_types, reason = "synchronous simulation state behind std Mutex")]

use std::{
    ops::Sub,
    sync::{Arc, Mutex},
    time::Duration,
};

use inkvault_core::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Wall-clock start of every simulation (2023-11-14T22:13:20Z).
pub const EPOCH_SECS: u64 = 1_700_000_000;

/// Point on the virtual monotonic clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimInstant(Duration);

impl SimInstant {
    /// Time since the simulation started.
    pub fn elapsed_since_start(self) -> Duration {
        self.0
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, rhs: Self) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

#[derive(Debug)]
struct SimState {
    rng: ChaCha8Rng,
    elapsed: Duration,
    wall_clock_resolved: bool,
}

/// Deterministic [`Environment`] for tests and simulation.
#[derive(Debug, Clone)]
pub struct SimEnv {
    state: Arc<Mutex<SimState>>,
}

impl SimEnv {
    /// Environment whose RNG stream is fixed by `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                rng: ChaCha8Rng::seed_from_u64(seed),
                elapsed: Duration::ZERO,
                wall_clock_resolved: true,
            })),
        }
    }

    /// Move both clocks forward.
    pub fn advance(&self, by: Duration) {
        let mut state = self.lock();
        state.elapsed = state.elapsed.saturating_add(by);
    }

    /// Make the wall clock unreadable (`false`) or readable again.
    ///
    /// While unreadable, finalized writes are stamped as unresolved.
    pub fn set_wall_clock_resolved(&self, resolved: bool) {
        self.lock().wall_clock_resolved = resolved;
    }

    #[allow(clippy::expect_used)]
    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().expect("Mutex poisoned")
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        SimInstant(self.lock().elapsed)
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.lock().rng.fill_bytes(buffer);
    }

    fn wall_clock_secs(&self) -> Option<u64> {
        let state = self.lock();
        state.wall_clock_resolved.then(|| EPOCH_SECS + state.elapsed.as_secs())
    }
}
