//! Storage abstraction for the record store.
//!
//! Trait-based abstraction for persisting records, the creation event log and
//! ledger progress. The trait is synchronous (no async); the ledger finalizes
//! one transaction at a time, so there is nothing to overlap.

mod chaotic;
mod error;
mod memory;
mod redb;

pub use chaotic::ChaoticStorage;
pub use error::StorageError;
use inkvault_core::{Account, Record, SequencedEvent};
pub use memory::MemoryStorage;

pub use self::redb::RedbStorage;

/// Storage abstraction for records and events.
///
/// Must be Clone (shared between the ledger and read handles), Send + Sync
/// (thread-safe), and synchronous. Implementations share internal state via
/// Arc, so clones access the same underlying storage.
///
/// # Panics
///
/// Implementations may panic if internal synchronization primitives are
/// poisoned (a thread panicked while holding a lock). Acceptable for
/// test/simulation code, but production implementations should handle poisoned
/// mutexes gracefully.
pub trait Storage: Clone + Send + Sync + 'static {
    /// Number of records in `owner`'s namespace (0 for unknown owners).
    fn record_count(&self, owner: &Account) -> Result<u64, StorageError>;

    /// Append a new record together with its creation event.
    ///
    /// Both writes commit atomically or not at all.
    ///
    /// # Invariants
    ///
    /// - Pre: `record.index()` equals `record_count(owner)`
    /// - Pre: `event.seq` equals `event_count()`
    /// - Post: `record_count(owner)` and `event_count()` each grew by one
    fn append_record(&self, record: &Record, event: &SequencedEvent) -> Result<(), StorageError>;

    /// Overwrite an existing record slot.
    ///
    /// Never creates a slot; returns `NotFound` if `record.index()` was not
    /// previously appended.
    fn put_record(&self, record: &Record) -> Result<(), StorageError>;

    /// Load one record. `None` if the slot does not exist.
    fn load_record(&self, owner: &Account, index: u64) -> Result<Option<Record>, StorageError>;

    /// Load records `[from, from+limit)` of `owner`'s namespace in index order.
    ///
    /// Returns fewer than `limit` when the namespace ends first.
    fn load_records(
        &self,
        owner: &Account,
        from: u64,
        limit: usize,
    ) -> Result<Vec<Record>, StorageError>;

    /// Every owner with at least one record, in ascending account order.
    fn list_owners(&self) -> Result<Vec<Account>, StorageError>;

    /// Length of the creation event log.
    fn event_count(&self) -> Result<u64, StorageError>;

    /// Load events `[from, from+limit)` in sequence order.
    fn load_events(&self, from: u64, limit: usize) -> Result<Vec<SequencedEvent>, StorageError>;

    /// Persist the height of the last finalized transaction.
    fn store_ledger_height(&self, height: u64) -> Result<(), StorageError>;

    /// Height of the last finalized transaction. `None` before the first.
    fn load_ledger_height(&self) -> Result<Option<u64>, StorageError>;
}
