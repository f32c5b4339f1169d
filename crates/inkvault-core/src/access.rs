//! Delegation ACL.
//!
//! Per-record read grants. Owners always read their own records; everyone
//! else needs a grant on that exact record. Grants are never inherited
//! across records.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{account::Account, error::StoreError, record::Record};

/// Accounts granted read access to one record.
///
/// Ordered so iteration and serialized form are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateSet(BTreeSet<Account>);

impl DelegateSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `account`. Returns `true` if it was not already present.
    pub fn grant(&mut self, account: Account) -> bool {
        self.0.insert(account)
    }

    /// Remove `account`. Returns `true` if it was present.
    pub fn revoke(&mut self, account: &Account) -> bool {
        self.0.remove(account)
    }

    /// Whether `account` holds a grant.
    pub fn contains(&self, account: &Account) -> bool {
        self.0.contains(account)
    }

    /// Grant holders in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.0.iter()
    }

    /// Number of grant holders.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nobody holds a grant.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How delegates are treated once a record is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletedRecordAccess {
    /// Delegates keep reading deleted records
    #[default]
    RetainDelegates,
    /// Only the owner reads deleted records; grants are kept but dormant
    OwnerOnly,
}

/// Read-authorization policy applied by the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessPolicy {
    /// Delegate treatment for deleted records
    pub deleted_records: DeletedRecordAccess,
}

/// Why a read was allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Caller owns the record
    Owner,
    /// Caller holds a delegate grant
    Delegate,
}

impl AccessPolicy {
    /// Decide whether `caller` may read `record`.
    ///
    /// # Errors
    ///
    /// - `Unauthorized`: caller is neither owner nor an active delegate
    pub fn authorize_read(&self, record: &Record, caller: Account) -> Result<Access, StoreError> {
        if caller == record.owner() {
            return Ok(Access::Owner);
        }

        let dormant = record.is_deleted() && self.deleted_records == DeletedRecordAccess::OwnerOnly;

        if !dormant && record.delegates().contains(&caller) {
            return Ok(Access::Delegate);
        }

        Err(StoreError::Unauthorized { caller, owner: record.owner(), index: record.index() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Timestamp;

    const OWNER: Account = Account::from_bytes([1; 20]);
    const READER: Account = Account::from_bytes([2; 20]);
    const STRANGER: Account = Account::from_bytes([3; 20]);

    fn shared_record() -> Record {
        let mut record = Record::create(OWNER, 4, b"ct".to_vec(), Timestamp::At(1)).unwrap();
        record.grant_delegate(READER).unwrap();
        record
    }

    #[test]
    fn owner_always_reads() {
        let mut record = shared_record();
        record.delete().unwrap();

        let strict = AccessPolicy { deleted_records: DeletedRecordAccess::OwnerOnly };
        assert_eq!(strict.authorize_read(&record, OWNER), Ok(Access::Owner));
    }

    #[test]
    fn delegate_reads_and_stranger_does_not() {
        let record = shared_record();
        let policy = AccessPolicy::default();

        assert_eq!(policy.authorize_read(&record, READER), Ok(Access::Delegate));
        assert_eq!(
            policy.authorize_read(&record, STRANGER),
            Err(StoreError::Unauthorized { caller: STRANGER, owner: OWNER, index: 4 })
        );
    }

    #[test]
    fn deleted_record_policy() {
        let mut record = shared_record();
        record.delete().unwrap();

        let retain = AccessPolicy::default();
        let strict = AccessPolicy { deleted_records: DeletedRecordAccess::OwnerOnly };

        assert_eq!(retain.authorize_read(&record, READER), Ok(Access::Delegate));
        assert!(matches!(
            strict.authorize_read(&record, READER),
            Err(StoreError::Unauthorized { .. })
        ));
        assert!(record.delegates().contains(&READER));
    }

    #[test]
    fn delegate_set_iterates_in_order() {
        let mut set = DelegateSet::new();
        set.grant(STRANGER);
        set.grant(READER);

        assert_eq!(set.iter().copied().collect::<Vec<_>>(), vec![READER, STRANGER]);
        assert_eq!(set.len(), 2);
    }
}
