#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use inkvault_core::{Account, Record, SequencedEvent};

use super::{Storage, StorageError};

/// In-memory storage implementation for testing and simulation
///
/// Records are kept per owner in index order, events in sequence order. All
/// state is wrapped in Arc<Mutex<>> to allow Clone and concurrent access.
/// Uses `lock().expect()` which will panic if the mutex is poisoned -
/// acceptable for test code.
#[derive(Clone)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryStorageInner>>,
}

#[derive(Default)]
struct MemoryStorageInner {
    /// Records organized by owner, stored in index order
    records: BTreeMap<Account, Vec<Record>>,

    /// Creation events in sequence order
    events: Vec<SequencedEvent>,

    /// Last finalized ledger height
    ledger_height: Option<u64>,
}

impl MemoryStorage {
    /// Create a new empty `MemoryStorage`
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(MemoryStorageInner::default())) }
    }

    /// Total number of records across all owners.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[allow(clippy::expect_used)]
    pub fn total_record_count(&self) -> usize {
        let inner = self.inner.lock().expect("Mutex poisoned");
        inner.records.values().map(Vec::len).sum()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    #[allow(clippy::expect_used)]
    fn record_count(&self, owner: &Account) -> Result<u64, StorageError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.records.get(owner).map_or(0, |records| records.len() as u64))
    }

    #[allow(clippy::expect_used)]
    fn append_record(&self, record: &Record, event: &SequencedEvent) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");

        let expected_seq = inner.events.len() as u64;
        if event.seq != expected_seq {
            return Err(StorageError::Conflict { expected: expected_seq, got: event.seq });
        }

        let expected_index = inner.records.get(&record.owner()).map_or(0, |r| r.len() as u64);
        if record.index() != expected_index {
            return Err(StorageError::Conflict { expected: expected_index, got: record.index() });
        }

        inner.records.entry(record.owner()).or_default().push(record.clone());
        inner.events.push(event.clone());

        debug_assert_eq!(inner.events.len() as u64, event.seq + 1);
        Ok(())
    }

    #[allow(clippy::expect_used)]
    fn put_record(&self, record: &Record) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().expect("Mutex poisoned");

        let slot = inner
            .records
            .get_mut(&record.owner())
            .and_then(|records| records.get_mut(record.index() as usize))
            .ok_or(StorageError::NotFound { owner: record.owner(), index: record.index() })?;

        debug_assert_eq!(slot.index(), record.index());
        *slot = record.clone();
        Ok(())
    }

    #[allow(clippy::expect_used)]
    fn load_record(&self, owner: &Account, index: u64) -> Result<Option<Record>, StorageError> {
        let inner = self.inner.lock().expect("Mutex poisoned");

        Ok(inner.records.get(owner).and_then(|records| records.get(index as usize)).cloned())
    }

    #[allow(clippy::expect_used)]
    fn load_records(
        &self,
        owner: &Account,
        from: u64,
        limit: usize,
    ) -> Result<Vec<Record>, StorageError> {
        let inner = self.inner.lock().expect("Mutex poisoned");

        let Some(records) = inner.records.get(owner) else {
            return Ok(Vec::new());
        };

        let start = (from as usize).min(records.len());
        let end = start.saturating_add(limit).min(records.len());

        Ok(records[start..end].to_vec())
    }

    #[allow(clippy::expect_used)]
    fn list_owners(&self) -> Result<Vec<Account>, StorageError> {
        let inner = self.inner.lock().expect("Mutex poisoned");
        Ok(inner.records.keys().copied().collect())
    }

    #[allow(clippy::expect_used)]
    fn event_count(&self) -> Result<u64, StorageError> {
        Ok(self.inner.lock().expect("Mutex poisoned").events.len() as u64)
    }

    #[allow(clippy::expect_used)]
    fn load_events(&self, from: u64, limit: usize) -> Result<Vec<SequencedEvent>, StorageError> {
        let inner = self.inner.lock().expect("Mutex poisoned");

        let start = (from as usize).min(inner.events.len());
        let end = start.saturating_add(limit).min(inner.events.len());

        Ok(inner.events[start..end].to_vec())
    }

    #[allow(clippy::expect_used)]
    fn store_ledger_height(&self, height: u64) -> Result<(), StorageError> {
        self.inner.lock().expect("Mutex poisoned").ledger_height = Some(height);
        Ok(())
    }

    #[allow(clippy::expect_used)]
    fn load_ledger_height(&self) -> Result<Option<u64>, StorageError> {
        Ok(self.inner.lock().expect("Mutex poisoned").ledger_height)
    }
}

#[cfg(test)]
mod tests {
    use inkvault_core::{RecordCreated, Timestamp};

    use super::*;

    const ALICE: Account = Account::from_bytes([0xA1; 20]);
    const BOB: Account = Account::from_bytes([0xB0; 20]);

    fn record(owner: Account, index: u64) -> (Record, RecordCreated) {
        let record =
            Record::create(owner, index, vec![index as u8 + 1; 8], Timestamp::At(index)).unwrap();
        let event = RecordCreated::for_record(&record);
        (record, event)
    }

    fn append(storage: &MemoryStorage, owner: Account, index: u64) {
        let (record, event) = record(owner, index);
        let seq = storage.event_count().unwrap();
        storage.append_record(&record, &SequencedEvent { seq, event }).unwrap();
    }

    #[test]
    fn append_is_sequential_per_owner() {
        let storage = MemoryStorage::new();

        append(&storage, ALICE, 0);
        append(&storage, BOB, 0);
        append(&storage, ALICE, 1);

        assert_eq!(storage.record_count(&ALICE).unwrap(), 2);
        assert_eq!(storage.record_count(&BOB).unwrap(), 1);
        assert_eq!(storage.event_count().unwrap(), 3);
        assert_eq!(storage.total_record_count(), 3);
    }

    #[test]
    fn append_gap_is_conflict_and_writes_nothing() {
        let storage = MemoryStorage::new();
        let (record, event) = record(ALICE, 2);

        let result = storage.append_record(&record, &SequencedEvent { seq: 0, event });

        assert_eq!(result, Err(StorageError::Conflict { expected: 0, got: 2 }));
        assert_eq!(storage.event_count().unwrap(), 0);
    }

    #[test]
    fn stale_event_seq_is_conflict() {
        let storage = MemoryStorage::new();
        append(&storage, ALICE, 0);

        let (record, event) = record(ALICE, 1);
        let result = storage.append_record(&record, &SequencedEvent { seq: 0, event });

        assert_eq!(result, Err(StorageError::Conflict { expected: 1, got: 0 }));
        assert_eq!(storage.record_count(&ALICE).unwrap(), 1);
    }

    #[test]
    fn put_record_never_creates_slots() {
        let storage = MemoryStorage::new();
        let (record, _) = record(ALICE, 0);

        assert_eq!(
            storage.put_record(&record),
            Err(StorageError::NotFound { owner: ALICE, index: 0 })
        );
    }

    #[test]
    fn load_records_paginates() {
        let storage = MemoryStorage::new();
        for i in 0..5 {
            append(&storage, ALICE, i);
        }

        let page = storage.load_records(&ALICE, 3, 10).unwrap();
        assert_eq!(page.iter().map(Record::index).collect::<Vec<_>>(), vec![3, 4]);
        assert!(storage.load_records(&ALICE, 9, 10).unwrap().is_empty());
        assert!(storage.load_records(&BOB, 0, 10).unwrap().is_empty());
    }

    #[test]
    fn owners_listed_in_order() {
        let storage = MemoryStorage::new();
        append(&storage, BOB, 0);
        append(&storage, ALICE, 0);

        assert_eq!(storage.list_owners().unwrap(), vec![ALICE, BOB]);
    }
}
