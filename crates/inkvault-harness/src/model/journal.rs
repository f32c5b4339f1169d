//! Reference record store.

use std::collections::{BTreeMap, BTreeSet};

use inkvault_core::{AccessPolicy, Account, ContentHash, DeletedRecordAccess, RecordView, Timestamp};
use inkvault_ledger::{Call, CallOutput};

use super::operation::ErrorKind;

/// One record as the model sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRecord {
    /// Current ciphertext
    pub ciphertext: Vec<u8>,
    /// Current version (1 at creation)
    pub version: u64,
    /// Time of the last content change
    pub timestamp: Timestamp,
    /// Soft-delete flag
    pub deleted: bool,
    /// Accounts granted read access
    pub delegates: BTreeSet<Account>,
}

/// Model journal: per-owner record vectors plus a creation log.
#[derive(Debug, Clone)]
pub struct ModelJournal {
    records: BTreeMap<Account, Vec<ModelRecord>>,
    creations: Vec<(Account, u64)>,
    policy: AccessPolicy,
    max_len: usize,
}

impl ModelJournal {
    /// Empty model enforcing `policy` and a ciphertext size limit.
    pub fn new(policy: AccessPolicy, max_len: usize) -> Self {
        Self { records: BTreeMap::new(), creations: Vec::new(), policy, max_len }
    }

    /// Record `index` of `owner`, deleted or not.
    pub fn record(&self, owner: Account, index: u64) -> Option<&ModelRecord> {
        self.records.get(&owner)?.get(index as usize)
    }

    /// Records ever created by `owner`.
    pub fn record_count(&self, owner: Account) -> u64 {
        self.records.get(&owner).map_or(0, |r| r.len() as u64)
    }

    /// Creation log as `(owner, index)` in creation order.
    pub fn creations(&self) -> &[(Account, u64)] {
        &self.creations
    }

    /// Owners with at least one record.
    pub fn owners(&self) -> impl Iterator<Item = Account> + '_ {
        self.records.keys().copied()
    }

    /// Apply a mutation as `caller` at `timestamp`.
    pub fn apply(
        &mut self,
        caller: Account,
        call: &Call,
        timestamp: Timestamp,
    ) -> Result<CallOutput, ErrorKind> {
        match call {
            Call::Create { ciphertext } => {
                self.check_len(ciphertext)?;
                let records = self.records.entry(caller).or_default();
                let index = records.len() as u64;
                records.push(ModelRecord {
                    ciphertext: ciphertext.clone(),
                    version: 1,
                    timestamp,
                    deleted: false,
                    delegates: BTreeSet::new(),
                });
                self.creations.push((caller, index));
                Ok(CallOutput::Created { index })
            },
            Call::Update { index, ciphertext, expected_version } => {
                match self.record(caller, *index) {
                    Some(record) if !record.deleted => {},
                    _ => return Err(ErrorKind::NotFound),
                }
                self.check_len(ciphertext)?;

                let record = self.record_mut(caller, *index)?;
                if record.version != *expected_version {
                    return Err(ErrorKind::VersionConflict);
                }
                record.ciphertext = ciphertext.clone();
                record.version += 1;
                record.timestamp = timestamp;
                Ok(CallOutput::Updated { version: record.version })
            },
            Call::Delete { index } => {
                let record = self.record_mut(caller, *index)?;
                if record.deleted {
                    return Err(ErrorKind::AlreadyDeleted);
                }
                record.deleted = true;
                Ok(CallOutput::Deleted)
            },
            Call::GrantDelegate { index, delegate } => {
                let record = self.record_mut(caller, *index)?;
                if record.deleted {
                    return Err(ErrorKind::NotFound);
                }
                let changed = *delegate != caller && record.delegates.insert(*delegate);
                Ok(CallOutput::DelegateGranted { changed })
            },
            Call::RevokeDelegate { index, delegate } => {
                let record = self.record_mut(caller, *index)?;
                let changed = record.delegates.remove(delegate);
                Ok(CallOutput::DelegateRevoked { changed })
            },
        }
    }

    /// Read one record as `caller`.
    pub fn read(
        &self,
        caller: Account,
        owner: Account,
        index: u64,
    ) -> Result<RecordView, ErrorKind> {
        let record = self.record(owner, index).ok_or(ErrorKind::NotFound)?;

        if caller != owner {
            let dormant =
                record.deleted && self.policy.deleted_records == DeletedRecordAccess::OwnerOnly;
            if dormant || !record.delegates.contains(&caller) {
                return Err(ErrorKind::Unauthorized);
            }
        }

        Ok(view(owner, index, record))
    }

    /// Read every record of `owner`; only the owner may.
    pub fn read_all(&self, caller: Account, owner: Account) -> Result<Vec<RecordView>, ErrorKind> {
        if caller != owner {
            return Err(ErrorKind::Unauthorized);
        }
        Ok(self.views(owner))
    }

    /// Views of every record of `owner`, bypassing access control.
    pub fn views(&self, owner: Account) -> Vec<RecordView> {
        self.records.get(&owner).map_or_else(Vec::new, |records| {
            records.iter().enumerate().map(|(i, r)| view(owner, i as u64, r)).collect()
        })
    }

    fn record_mut(&mut self, owner: Account, index: u64) -> Result<&mut ModelRecord, ErrorKind> {
        self.records
            .get_mut(&owner)
            .and_then(|r| r.get_mut(index as usize))
            .ok_or(ErrorKind::NotFound)
    }

    fn check_len(&self, ciphertext: &[u8]) -> Result<(), ErrorKind> {
        if ciphertext.is_empty() || ciphertext.len() > self.max_len {
            return Err(ErrorKind::InvalidInput);
        }
        Ok(())
    }
}

fn view(owner: Account, index: u64, record: &ModelRecord) -> RecordView {
    RecordView {
        owner,
        index,
        ciphertext: record.ciphertext.clone(),
        timestamp: record.timestamp,
        version: record.version,
        content_hash: ContentHash::of(&record.ciphertext),
        deleted: record.deleted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: Account = Account::from_bytes([1; 20]);
    const OTHER: Account = Account::from_bytes([2; 20]);
    const AT: Timestamp = Timestamp::At(100);

    fn model() -> ModelJournal {
        ModelJournal::new(AccessPolicy::default(), 16)
    }

    #[test]
    fn update_checks_existence_before_size() {
        let mut model = model();

        let result = model.apply(
            OWNER,
            &Call::Update { index: 0, ciphertext: Vec::new(), expected_version: 1 },
            AT,
        );

        assert_eq!(result, Err(ErrorKind::NotFound));
    }

    #[test]
    fn owner_only_policy_hides_deleted_records_from_delegates() {
        let policy = AccessPolicy { deleted_records: DeletedRecordAccess::OwnerOnly };
        let mut model = ModelJournal::new(policy, 16);
        model.apply(OWNER, &Call::Create { ciphertext: b"x".to_vec() }, AT).unwrap();
        model.apply(OWNER, &Call::GrantDelegate { index: 0, delegate: OTHER }, AT).unwrap();
        assert!(model.read(OTHER, OWNER, 0).is_ok());

        model.apply(OWNER, &Call::Delete { index: 0 }, AT).unwrap();

        assert_eq!(model.read(OTHER, OWNER, 0), Err(ErrorKind::Unauthorized));
        assert!(model.read(OWNER, OWNER, 0).unwrap().deleted);
    }

    #[test]
    fn granting_owner_is_noop() {
        let mut model = model();
        model.apply(OWNER, &Call::Create { ciphertext: b"x".to_vec() }, AT).unwrap();

        let result = model.apply(OWNER, &Call::GrantDelegate { index: 0, delegate: OWNER }, AT);

        assert_eq!(result, Ok(CallOutput::DelegateGranted { changed: false }));
    }
}
