//! Persisted state snapshots for invariant checking.
//!
//! Invariants run against a snapshot taken between operations rather than
//! live storage, so one check sees one consistent state.

use std::collections::BTreeMap;

use inkvault_core::{Account, Record, SequencedEvent};
use inkvault_ledger::{Storage, StorageError};

/// Everything a storage backend holds, loaded into memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    /// Records per owner, in storage order
    pub records: BTreeMap<Account, Vec<Record>>,
    /// Durable creation log
    pub events: Vec<SequencedEvent>,
    /// Last persisted ledger height
    pub ledger_height: Option<u64>,
}

impl LedgerSnapshot {
    /// Load the full contents of `storage`.
    pub fn capture<S: Storage>(storage: &S) -> Result<Self, StorageError> {
        let mut records = BTreeMap::new();
        for owner in storage.list_owners()? {
            records.insert(owner, storage.load_records(&owner, 0, usize::MAX)?);
        }

        Ok(Self {
            records,
            events: storage.load_events(0, usize::MAX)?,
            ledger_height: storage.load_ledger_height()?,
        })
    }

    /// Record `index` of `owner`.
    pub fn record(&self, owner: &Account, index: u64) -> Option<&Record> {
        self.records.get(owner)?.get(index as usize)
    }

    /// Every record, owner by owner.
    pub fn all_records(&self) -> impl Iterator<Item = &Record> {
        self.records.values().flatten()
    }

    /// Total number of records.
    pub fn record_total(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }
}
