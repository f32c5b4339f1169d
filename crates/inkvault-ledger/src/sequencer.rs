//! Ledger height sequencer.
//!
//! Assigns strictly increasing heights to finalized transactions. The next
//! height is cached in memory and loaded lazily from storage, so a restarted
//! ledger continues numbering where the previous process stopped.
//!
//! Heights are reserved (persisted) before a transaction is applied. A crash
//! or rejection after reservation leaves a gap, never a reused height.

use thiserror::Error;

use crate::storage::{Storage, StorageError};

/// Errors that can occur during sequencing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequencerError {
    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(String),

    /// Height space exhausted
    #[error("ledger height overflow after {0}")]
    Overflow(u64),
}

impl From<StorageError> for SequencerError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Ledger height sequencer
#[derive(Debug, Default)]
pub struct Sequencer {
    /// Next height to assign; `None` until loaded from storage
    next_height: Option<u64>,
}

impl Sequencer {
    /// Create a new sequencer (state not yet loaded)
    pub fn new() -> Self {
        Self { next_height: None }
    }

    /// Load state from storage.
    ///
    /// Called during ledger recovery. If already initialized, this is a no-op.
    ///
    /// # Errors
    ///
    /// Returns error if storage query fails.
    pub fn initialize(&mut self, storage: &impl Storage) -> Result<u64, SequencerError> {
        if let Some(next) = self.next_height {
            return Ok(next);
        }

        let latest = storage.load_ledger_height().map_err(|e| {
            tracing::error!(error = %e, "Failed to load ledger height during initialization");
            e
        })?;

        let next = match latest {
            Some(h) => h.checked_add(1).ok_or(SequencerError::Overflow(h))?,
            None => 0,
        };

        tracing::info!(latest_height = ?latest, next_height = next, "Initialized sequencer");

        self.next_height = Some(next);
        Ok(next)
    }

    /// Reserve the next height.
    ///
    /// # Invariants
    ///
    /// - Post: the returned height is persisted as the latest height
    /// - Post: every later reservation returns a larger height
    ///
    /// On storage failure nothing is reserved and the cache is dropped, so
    /// the next call re-reads storage.
    pub fn reserve(&mut self, storage: &impl Storage) -> Result<u64, SequencerError> {
        let height = self.initialize(storage)?;
        let next = height.checked_add(1).ok_or(SequencerError::Overflow(height))?;

        if let Err(e) = storage.store_ledger_height(height) {
            self.next_height = None;
            return Err(e.into());
        }

        self.next_height = Some(next);

        debug_assert!(next > height);
        Ok(height)
    }

    /// Next height that will be assigned, if loaded.
    pub fn next_height(&self) -> Option<u64> {
        self.next_height
    }

    /// Forces re-initialization from storage on next reservation.
    pub fn reset(&mut self) {
        self.next_height = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ChaoticStorage, MemoryStorage};

    #[test]
    fn fresh_storage_starts_at_zero() {
        let storage = MemoryStorage::new();
        let mut sequencer = Sequencer::new();

        assert_eq!(sequencer.reserve(&storage), Ok(0));
        assert_eq!(sequencer.reserve(&storage), Ok(1));
        assert_eq!(storage.load_ledger_height().unwrap(), Some(1));
    }

    #[test]
    fn resumes_after_restart() {
        let storage = MemoryStorage::new();
        let mut first = Sequencer::new();
        for _ in 0..5 {
            first.reserve(&storage).unwrap();
        }

        let mut second = Sequencer::new();
        assert_eq!(second.initialize(&storage), Ok(5));
        assert_eq!(second.reserve(&storage), Ok(5));
    }

    #[test]
    fn failed_reservation_does_not_advance() {
        let storage = ChaoticStorage::new(MemoryStorage::new(), 1.0);
        let mut sequencer = Sequencer::new();

        assert!(matches!(sequencer.reserve(&storage), Err(SequencerError::Storage(_))));
        assert_eq!(sequencer.next_height(), None);

        let healthy = storage.inner().clone();
        assert_eq!(sequencer.reserve(&healthy), Ok(0));
    }

    #[test]
    fn reset_reloads_from_storage() {
        let storage = MemoryStorage::new();
        let mut sequencer = Sequencer::new();
        sequencer.reserve(&storage).unwrap();

        storage.store_ledger_height(41).unwrap();
        sequencer.reset();

        assert_eq!(sequencer.reserve(&storage), Ok(42));
    }
}
