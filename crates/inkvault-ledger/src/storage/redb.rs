//! Redb-backed durable storage implementation.
//!
//! Uses Redb's ACID transactions with Copy-on-Write for crash safety. A record
//! append and its creation event land in one write transaction, so a crash
//! never leaves a record without its event or the reverse.

use std::{fmt::Display, path::Path, sync::Arc};

use inkvault_core::{ACCOUNT_LEN, Account, Record, SequencedEvent};
use redb::{Database, ReadableTable, TableDefinition};
use serde::{Serialize, de::DeserializeOwned};

use super::{Storage, StorageError};

/// Table: records
/// Key: (owner: 20 bytes, index: u64 BE) [28 bytes]
/// Value: CBOR-encoded Record
const RECORDS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("records");

/// Table: owners
/// Key: owner [20 bytes]
/// Value: record count
const OWNERS: TableDefinition<&[u8], u64> = TableDefinition::new("owners");

/// Table: events
/// Key: event sequence number
/// Value: CBOR-encoded SequencedEvent
const EVENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("events");

/// Table: meta
/// Key: counter name
/// Value: counter value
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");

const EVENT_COUNT: &str = "event_count";
const LEDGER_HEIGHT: &str = "ledger_height";

const RECORD_KEY_LEN: usize = ACCOUNT_LEN + 8;

/// Durable storage backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbStorage {
    db: Arc<Database>,
}

impl RedbStorage {
    /// Open or create a Redb database at the given path.
    ///
    /// Creates tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(io)?;

        let txn = db.begin_write().map_err(io)?;
        {
            let _ = txn.open_table(RECORDS).map_err(io)?;
            let _ = txn.open_table(OWNERS).map_err(io)?;
            let _ = txn.open_table(EVENTS).map_err(io)?;
            let _ = txn.open_table(META).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        tracing::info!(path = %path.as_ref().display(), "Opened redb storage");

        Ok(Self { db: Arc::new(db) })
    }
}

impl Storage for RedbStorage {
    fn record_count(&self, owner: &Account) -> Result<u64, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(OWNERS).map_err(io)?;

        owner_count(&table, owner)
    }

    fn append_record(&self, record: &Record, event: &SequencedEvent) -> Result<(), StorageError> {
        let record_bytes = to_cbor(record)?;
        let event_bytes = to_cbor(event)?;
        let owner = record.owner();

        let txn = self.db.begin_write().map_err(io)?;
        {
            let mut meta = txn.open_table(META).map_err(io)?;
            let expected_seq = meta_counter(&meta, EVENT_COUNT)?.unwrap_or(0);
            if event.seq != expected_seq {
                return Err(StorageError::Conflict { expected: expected_seq, got: event.seq });
            }

            let mut owners = txn.open_table(OWNERS).map_err(io)?;
            let expected_index = owner_count(&owners, &owner)?;
            if record.index() != expected_index {
                return Err(StorageError::Conflict {
                    expected: expected_index,
                    got: record.index(),
                });
            }

            let mut records = txn.open_table(RECORDS).map_err(io)?;
            let key = encode_record_key(&owner, record.index());
            records.insert(key.as_slice(), record_bytes.as_slice()).map_err(io)?;

            let mut events = txn.open_table(EVENTS).map_err(io)?;
            events.insert(event.seq, event_bytes.as_slice()).map_err(io)?;

            owners.insert(owner.as_bytes().as_slice(), expected_index + 1).map_err(io)?;
            meta.insert(EVENT_COUNT, expected_seq + 1).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        Ok(())
    }

    fn put_record(&self, record: &Record) -> Result<(), StorageError> {
        let bytes = to_cbor(record)?;
        let key = encode_record_key(&record.owner(), record.index());

        let txn = self.db.begin_write().map_err(io)?;
        {
            let mut table = txn.open_table(RECORDS).map_err(io)?;

            if table.get(key.as_slice()).map_err(io)?.is_none() {
                return Err(StorageError::NotFound { owner: record.owner(), index: record.index() });
            }

            table.insert(key.as_slice(), bytes.as_slice()).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        Ok(())
    }

    fn load_record(&self, owner: &Account, index: u64) -> Result<Option<Record>, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(RECORDS).map_err(io)?;

        let key = encode_record_key(owner, index);

        match table.get(key.as_slice()).map_err(io)? {
            Some(value) => Ok(Some(from_cbor(value.value())?)),
            None => Ok(None),
        }
    }

    fn load_records(
        &self,
        owner: &Account,
        from: u64,
        limit: usize,
    ) -> Result<Vec<Record>, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(RECORDS).map_err(io)?;

        let start_key = encode_record_key(owner, from);
        let end_key = encode_record_key(owner, u64::MAX);

        let results = table.range(start_key.as_slice()..=end_key.as_slice()).map_err(io)?;

        let mut records = Vec::new();
        for result in results {
            if records.len() >= limit {
                break;
            }

            let (_, value) = result.map_err(io)?;
            records.push(from_cbor(value.value())?);
        }

        Ok(records)
    }

    fn list_owners(&self) -> Result<Vec<Account>, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(OWNERS).map_err(io)?;

        let mut owners = Vec::new();
        for result in table.iter().map_err(io)? {
            let (key, _) = result.map_err(io)?;
            owners.push(decode_account(key.value())?);
        }

        Ok(owners)
    }

    fn event_count(&self) -> Result<u64, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(META).map_err(io)?;

        Ok(meta_counter(&table, EVENT_COUNT)?.unwrap_or(0))
    }

    fn load_events(&self, from: u64, limit: usize) -> Result<Vec<SequencedEvent>, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(EVENTS).map_err(io)?;

        let mut events = Vec::new();
        for result in table.range(from..).map_err(io)? {
            if events.len() >= limit {
                break;
            }

            let (_, value) = result.map_err(io)?;
            events.push(from_cbor(value.value())?);
        }

        Ok(events)
    }

    fn store_ledger_height(&self, height: u64) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(io)?;
        {
            let mut table = txn.open_table(META).map_err(io)?;
            table.insert(LEDGER_HEIGHT, height).map_err(io)?;
        }
        txn.commit().map_err(io)?;

        Ok(())
    }

    fn load_ledger_height(&self) -> Result<Option<u64>, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(META).map_err(io)?;

        meta_counter(&table, LEDGER_HEIGHT)
    }
}

fn io(err: impl Display) -> StorageError {
    StorageError::Io(err.to_string())
}

fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(bytes)
}

fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    ciborium::from_reader(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn owner_count<T: ReadableTable<&'static [u8], u64>>(
    table: &T,
    owner: &Account,
) -> Result<u64, StorageError> {
    Ok(table.get(owner.as_bytes().as_slice()).map_err(io)?.map_or(0, |v| v.value()))
}

fn meta_counter<T: ReadableTable<&'static str, u64>>(
    table: &T,
    name: &str,
) -> Result<Option<u64>, StorageError> {
    Ok(table.get(name).map_err(io)?.map(|v| v.value()))
}

/// Encode (owner, index) as a 28-byte key.
///
/// Layout: [owner: 20 bytes][index: 8 bytes BE]
/// Lexicographic ordering matches (owner, index) ordering.
fn encode_record_key(owner: &Account, index: u64) -> [u8; RECORD_KEY_LEN] {
    let mut key = [0u8; RECORD_KEY_LEN];
    key[..ACCOUNT_LEN].copy_from_slice(owner.as_bytes());
    key[ACCOUNT_LEN..].copy_from_slice(&index.to_be_bytes());
    key
}

fn decode_account(bytes: &[u8]) -> Result<Account, StorageError> {
    let bytes: [u8; ACCOUNT_LEN] = bytes
        .try_into()
        .map_err(|_| StorageError::Serialization(format!("owner key is {} bytes", bytes.len())))?;
    Ok(Account::from_bytes(bytes))
}

#[cfg(test)]
mod tests {
    use inkvault_core::{RecordCreated, Timestamp};
    use tempfile::tempdir;

    use super::*;

    const ALICE: Account = Account::from_bytes([0xA1; 20]);
    const BOB: Account = Account::from_bytes([0xB0; 20]);

    fn append(storage: &RedbStorage, owner: Account, index: u64) -> Record {
        let record =
            Record::create(owner, index, vec![index as u8 + 1; 16], Timestamp::At(10)).unwrap();
        let seq = storage.event_count().unwrap();
        let event = SequencedEvent { seq, event: RecordCreated::for_record(&record) };
        storage.append_record(&record, &event).unwrap();
        record
    }

    #[test]
    fn record_key_orders_by_owner_then_index() {
        let a = encode_record_key(&ALICE, 255);
        let b = encode_record_key(&ALICE, 256);
        let c = encode_record_key(&BOB, 0);

        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn append_and_load() {
        let dir = tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("test.redb")).unwrap();

        let first = append(&storage, ALICE, 0);
        append(&storage, ALICE, 1);

        assert_eq!(storage.record_count(&ALICE).unwrap(), 2);
        assert_eq!(storage.load_record(&ALICE, 0).unwrap(), Some(first));
        assert_eq!(storage.load_record(&ALICE, 2).unwrap(), None);
        assert_eq!(storage.record_count(&BOB).unwrap(), 0);
    }

    #[test]
    fn append_gap_is_conflict() {
        let dir = tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("test.redb")).unwrap();
        append(&storage, ALICE, 0);

        let record = Record::create(ALICE, 2, b"gap".to_vec(), Timestamp::At(0)).unwrap();
        let event = SequencedEvent { seq: 1, event: RecordCreated::for_record(&record) };

        assert_eq!(
            storage.append_record(&record, &event),
            Err(StorageError::Conflict { expected: 1, got: 2 })
        );
        assert_eq!(storage.event_count().unwrap(), 1);
    }

    #[test]
    fn load_records_stays_in_namespace() {
        let dir = tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("test.redb")).unwrap();

        for i in 0..3 {
            append(&storage, ALICE, i);
        }
        append(&storage, BOB, 0);

        let page = storage.load_records(&ALICE, 1, 100).unwrap();
        assert_eq!(page.iter().map(Record::index).collect::<Vec<_>>(), vec![1, 2]);
        assert!(page.iter().all(|r| r.owner() == ALICE));
        assert_eq!(storage.list_owners().unwrap(), vec![ALICE, BOB]);
    }

    #[test]
    fn put_record_overwrites_existing_slot_only() {
        let dir = tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("test.redb")).unwrap();

        let mut record = append(&storage, ALICE, 0);
        record.update(b"edited".to_vec(), 1, Timestamp::At(20)).unwrap();
        storage.put_record(&record).unwrap();

        assert_eq!(storage.load_record(&ALICE, 0).unwrap(), Some(record));

        let stray = Record::create(ALICE, 5, b"x".to_vec(), Timestamp::At(0)).unwrap();
        assert_eq!(
            storage.put_record(&stray),
            Err(StorageError::NotFound { owner: ALICE, index: 5 })
        );
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.redb");

        {
            let storage = RedbStorage::open(&path).unwrap();
            append(&storage, ALICE, 0);
            storage.store_ledger_height(7).unwrap();
        }

        let storage = RedbStorage::open(&path).unwrap();
        assert_eq!(storage.record_count(&ALICE).unwrap(), 1);
        assert_eq!(storage.event_count().unwrap(), 1);
        assert_eq!(storage.load_ledger_height().unwrap(), Some(7));
        assert_eq!(storage.load_events(0, 10).unwrap()[0].event.owner, ALICE);
    }
}
