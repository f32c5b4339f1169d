//! Versioned record store with delegation.
//!
//! Applies one caller-authenticated operation at a time against [`Storage`].
//! Mutations only ever address the caller's own namespace: there is no owner
//! argument to name, so ownership isolation holds by construction. Reads take
//! an explicit owner and go through the [`AccessPolicy`].
//!
//! Each operation performs at most one storage write, so a failure at any
//! point leaves persisted state untouched.

use inkvault_core::{
    AccessPolicy, Account, CallContext, Record, RecordCreated, RecordView, SequencedEvent,
    StoreError,
};

use crate::storage::Storage;

/// Default upper bound on a single ciphertext (64 KiB).
pub const DEFAULT_MAX_CIPHERTEXT_LEN: usize = 64 * 1024;

/// Per-owner record store.
#[derive(Clone)]
pub struct RecordStore<S: Storage> {
    storage: S,
    policy: AccessPolicy,
    max_ciphertext_len: usize,
}

impl<S: Storage> RecordStore<S> {
    /// Store over `storage` with the given read policy and size bound.
    pub fn new(storage: S, policy: AccessPolicy, max_ciphertext_len: usize) -> Self {
        Self { storage, policy, max_ciphertext_len }
    }

    /// Underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Read policy in force.
    pub fn policy(&self) -> AccessPolicy {
        self.policy
    }

    /// Append a record owned by the caller.
    ///
    /// Returns the creation event, whose payload carries the assigned index.
    ///
    /// # Errors
    ///
    /// - `InvalidInput`: empty or oversized ciphertext
    /// - `Storage`: persistence failed; nothing was written
    pub fn create(
        &self,
        ctx: &CallContext,
        ciphertext: Vec<u8>,
    ) -> Result<SequencedEvent, StoreError> {
        self.check_len(&ciphertext)?;

        let owner = ctx.caller();
        let index = self.storage.record_count(&owner)?;
        let record = Record::create(owner, index, ciphertext, ctx.timestamp())?;

        let seq = self.storage.event_count()?;
        let event = SequencedEvent { seq, event: RecordCreated::for_record(&record) };

        self.storage.append_record(&record, &event)?;

        tracing::debug!(
            owner = %owner,
            index,
            seq,
            hash = %record.content_hash(),
            "Record created"
        );

        Ok(event)
    }

    /// Read one record as owner or delegate.
    ///
    /// Deleted records stay readable; check [`RecordView::deleted`].
    ///
    /// # Errors
    ///
    /// - `NotFound`: `index` is outside `owner`'s range
    /// - `Unauthorized`: caller is neither owner nor an active delegate
    pub fn read(
        &self,
        ctx: &CallContext,
        owner: Account,
        index: u64,
    ) -> Result<RecordView, StoreError> {
        let record = self.load(owner, index)?;
        self.policy.authorize_read(&record, ctx.caller())?;

        Ok(record.view())
    }

    /// Every record of `owner` in index order, including deleted ones.
    ///
    /// Only the owner may enumerate; delegation is per record.
    ///
    /// # Errors
    ///
    /// - `Unauthorized`: caller is not `owner`
    pub fn read_all(
        &self,
        ctx: &CallContext,
        owner: Account,
    ) -> Result<Vec<RecordView>, StoreError> {
        if ctx.caller() != owner {
            return Err(StoreError::Unauthorized { caller: ctx.caller(), owner, index: 0 });
        }

        let records = self.storage.load_records(&owner, 0, usize::MAX)?;

        debug_assert!(records.iter().enumerate().all(|(i, r)| r.index() == i as u64));
        Ok(records.iter().map(Record::view).collect())
    }

    /// Number of records ever created by `owner`.
    ///
    /// Record counts are public metadata.
    pub fn record_count(&self, owner: Account) -> Result<u64, StoreError> {
        Ok(self.storage.record_count(&owner)?)
    }

    /// Replace the caller's record `index` if `expected_version` is current.
    ///
    /// Returns the new version.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such record, or it is deleted
    /// - `InvalidInput`: empty or oversized ciphertext
    /// - `VersionConflict`: `expected_version` is stale; record unchanged
    pub fn update(
        &self,
        ctx: &CallContext,
        index: u64,
        ciphertext: Vec<u8>,
        expected_version: u64,
    ) -> Result<u64, StoreError> {
        let owner = ctx.caller();
        let mut record = self.load_live(owner, index)?;
        self.check_len(&ciphertext)?;

        let version = record.update(ciphertext, expected_version, ctx.timestamp())?;
        self.storage.put_record(&record)?;

        tracing::debug!(owner = %owner, index, version, "Record updated");
        Ok(version)
    }

    /// Soft-delete the caller's record `index`.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such record
    /// - `AlreadyDeleted`: record was already deleted
    pub fn delete(&self, ctx: &CallContext, index: u64) -> Result<(), StoreError> {
        let owner = ctx.caller();
        let mut record = self.load(owner, index)?;

        record.delete()?;
        self.storage.put_record(&record)?;

        tracing::debug!(owner = %owner, index, version = record.version(), "Record deleted");
        Ok(())
    }

    /// Grant `delegate` read access to the caller's record `index`.
    ///
    /// Idempotent. Returns whether the delegate set changed.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such record, or it is deleted
    pub fn grant_delegate(
        &self,
        ctx: &CallContext,
        index: u64,
        delegate: Account,
    ) -> Result<bool, StoreError> {
        let owner = ctx.caller();
        let mut record = self.load(owner, index)?;

        let changed = record.grant_delegate(delegate)?;
        if changed {
            self.storage.put_record(&record)?;
        }

        tracing::debug!(owner = %owner, index, delegate = %delegate, changed, "Delegate granted");
        Ok(changed)
    }

    /// Revoke `delegate`'s read access to the caller's record `index`.
    ///
    /// Idempotent, and allowed on deleted records. Returns whether the
    /// delegate set changed.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such record
    pub fn revoke_delegate(
        &self,
        ctx: &CallContext,
        index: u64,
        delegate: Account,
    ) -> Result<bool, StoreError> {
        let owner = ctx.caller();
        let mut record = self.load(owner, index)?;

        let changed = record.revoke_delegate(delegate);
        if changed {
            self.storage.put_record(&record)?;
        }

        tracing::debug!(owner = %owner, index, delegate = %delegate, changed, "Delegate revoked");
        Ok(changed)
    }

    /// Current delegates of `owner`'s record `index`.
    ///
    /// Visible to whoever may read the record.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such record
    /// - `Unauthorized`: caller may not read the record
    pub fn delegates(
        &self,
        ctx: &CallContext,
        owner: Account,
        index: u64,
    ) -> Result<Vec<Account>, StoreError> {
        let record = self.load(owner, index)?;
        self.policy.authorize_read(&record, ctx.caller())?;

        Ok(record.delegates().iter().copied().collect())
    }

    fn load(&self, owner: Account, index: u64) -> Result<Record, StoreError> {
        self.storage.load_record(&owner, index)?.ok_or(StoreError::NotFound { owner, index })
    }

    fn load_live(&self, owner: Account, index: u64) -> Result<Record, StoreError> {
        let record = self.load(owner, index)?;
        if record.is_deleted() {
            return Err(StoreError::NotFound { owner, index });
        }
        Ok(record)
    }

    fn check_len(&self, ciphertext: &[u8]) -> Result<(), StoreError> {
        if ciphertext.is_empty() {
            return Err(StoreError::InvalidInput("ciphertext is empty".to_string()));
        }

        if ciphertext.len() > self.max_ciphertext_len {
            return Err(StoreError::InvalidInput(format!(
                "ciphertext is {} bytes, limit is {}",
                ciphertext.len(),
                self.max_ciphertext_len
            )));
        }

        Ok(())
    }
}
