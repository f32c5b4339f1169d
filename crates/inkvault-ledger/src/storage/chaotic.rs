//! Chaotic storage wrapper for fault injection testing
//!
//! Randomly fails storage calls before they reach the wrapped backend, so an
//! injected failure never leaves a partial write behind. Used to check that
//! every store operation either fully applies or leaves state untouched.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::sync::{Arc, Mutex};

use inkvault_core::{Account, Record, SequencedEvent};

use super::{Storage, StorageError};

/// Storage wrapper that randomly injects I/O failures
///
/// Clones share the RNG and counters.
#[derive(Clone)]
pub struct ChaoticStorage<S: Storage> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    state: Arc<Mutex<ChaosState>>,
}

struct ChaosState {
    rng: ChaoticRng,
    operations: usize,
    injected: usize,
}

/// Linear congruential generator; reproducible for a given seed.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    /// Next value in [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // Numerical Recipes constants
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }
}

impl<S: Storage> ChaoticStorage<S> {
    /// Wrap `inner` with a fixed default seed.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x1234_5678_9ABC_DEF0)
    }

    /// Wrap `inner` with an explicit seed for reproducible chaos.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is not in [0.0, 1.0]
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "failure_rate must be between 0.0 and 1.0, got {failure_rate}"
        );

        Self {
            inner,
            failure_rate,
            state: Arc::new(Mutex::new(ChaosState {
                rng: ChaoticRng { state: seed },
                operations: 0,
                injected: 0,
            })),
        }
    }

    /// Underlying storage (for checking invariants after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Storage calls attempted so far.
    #[allow(clippy::expect_used)]
    pub fn operation_count(&self) -> usize {
        self.state.lock().expect("ChaosState mutex poisoned").operations
    }

    /// Storage calls failed by injection so far.
    #[allow(clippy::expect_used)]
    pub fn injected_failures(&self) -> usize {
        self.state.lock().expect("ChaosState mutex poisoned").injected
    }

    #[allow(clippy::expect_used)]
    fn roll(&self, operation: &'static str) -> Result<(), StorageError> {
        let mut state = self.state.lock().expect("ChaosState mutex poisoned");
        state.operations += 1;

        if state.rng.next() < self.failure_rate {
            state.injected += 1;
            tracing::debug!(operation, "Injecting storage failure");
            return Err(StorageError::Io(format!("chaotic failure injection: {operation}")));
        }

        Ok(())
    }
}

impl<S: Storage> Storage for ChaoticStorage<S> {
    fn record_count(&self, owner: &Account) -> Result<u64, StorageError> {
        self.roll("record_count")?;
        self.inner.record_count(owner)
    }

    fn append_record(&self, record: &Record, event: &SequencedEvent) -> Result<(), StorageError> {
        self.roll("append_record")?;
        self.inner.append_record(record, event)
    }

    fn put_record(&self, record: &Record) -> Result<(), StorageError> {
        self.roll("put_record")?;
        self.inner.put_record(record)
    }

    fn load_record(&self, owner: &Account, index: u64) -> Result<Option<Record>, StorageError> {
        self.roll("load_record")?;
        self.inner.load_record(owner, index)
    }

    fn load_records(
        &self,
        owner: &Account,
        from: u64,
        limit: usize,
    ) -> Result<Vec<Record>, StorageError> {
        self.roll("load_records")?;
        self.inner.load_records(owner, from, limit)
    }

    fn list_owners(&self) -> Result<Vec<Account>, StorageError> {
        self.roll("list_owners")?;
        self.inner.list_owners()
    }

    fn event_count(&self) -> Result<u64, StorageError> {
        self.roll("event_count")?;
        self.inner.event_count()
    }

    fn load_events(&self, from: u64, limit: usize) -> Result<Vec<SequencedEvent>, StorageError> {
        self.roll("load_events")?;
        self.inner.load_events(from, limit)
    }

    fn store_ledger_height(&self, height: u64) -> Result<(), StorageError> {
        self.roll("store_ledger_height")?;
        self.inner.store_ledger_height(height)
    }

    fn load_ledger_height(&self) -> Result<Option<u64>, StorageError> {
        self.roll("load_ledger_height")?;
        self.inner.load_ledger_height()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    const OWNER: Account = Account::from_bytes([7; 20]);

    #[test]
    fn zero_rate_never_fails() {
        let chaotic = ChaoticStorage::new(MemoryStorage::new(), 0.0);

        for _ in 0..100 {
            chaotic.record_count(&OWNER).unwrap();
        }

        assert_eq!(chaotic.operation_count(), 100);
        assert_eq!(chaotic.injected_failures(), 0);
    }

    #[test]
    fn full_rate_always_fails() {
        let chaotic = ChaoticStorage::new(MemoryStorage::new(), 1.0);

        assert!(matches!(chaotic.record_count(&OWNER), Err(StorageError::Io(_))));
        assert!(chaotic.load_events(0, 10).is_err());
        assert!(chaotic.store_ledger_height(1).is_err());
        assert_eq!(chaotic.inner().load_ledger_height().unwrap(), None);
    }

    #[test]
    fn same_seed_same_failures() {
        let a = ChaoticStorage::with_seed(MemoryStorage::new(), 0.5, 42);
        let b = ChaoticStorage::with_seed(MemoryStorage::new(), 0.5, 42);

        for i in 0..100 {
            assert_eq!(
                a.event_count().is_ok(),
                b.event_count().is_ok(),
                "determinism violated at iteration {i}"
            );
        }
    }

    #[test]
    #[should_panic(expected = "failure_rate must be between 0.0 and 1.0")]
    fn rejects_invalid_failure_rate() {
        let _chaotic = ChaoticStorage::new(MemoryStorage::new(), 1.5);
    }
}
