//! Records and their state transitions.
//!
//! A [`Record`] enforces its own lifecycle rules (version arithmetic, the
//! terminal deleted state, delegate edits). Authorization (who may call
//! those transitions) is the store's job and lives outside this module.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{access::DelegateSet, account::Account, error::StoreError};

/// Domain separator for [`RecordBinding::aad`]
const BINDING_AAD_LABEL: &[u8] = b"inkvault/record-binding/v1";

/// Domain separator for [`Record::binding_digest`]
const BINDING_DIGEST_LABEL: &[u8] = b"inkvault/binding-digest/v1";

/// SHA-256 digest of a record's ciphertext.
///
/// An integrity fingerprint callers can recompute and compare. It is not
/// bound to the record's owner or slot; see [`Record::binding_digest`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Digest `bytes`.
    pub fn of(bytes: &[u8]) -> Self {
        Self(Sha256::digest(bytes).into())
    }

    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({self})")
    }
}

/// Finalization time of a write.
///
/// `Unresolved` is an explicit sentinel for "the ledger could not resolve a
/// wall-clock time"; it is never coerced to zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timestamp {
    /// Seconds since the Unix epoch
    At(u64),
    /// No time could be resolved
    Unresolved,
}

impl Timestamp {
    /// Lift an optional clock reading.
    pub fn from_secs(secs: Option<u64>) -> Self {
        secs.map_or(Self::Unresolved, Self::At)
    }

    /// Seconds since the Unix epoch, if resolved.
    pub fn secs(self) -> Option<u64> {
        match self {
            Self::At(secs) => Some(secs),
            Self::Unresolved => None,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::At(secs) => write!(f, "{secs}"),
            Self::Unresolved => f.write_str("unresolved"),
        }
    }
}

/// Identity of one version of one record slot.
///
/// Callers that store ciphertext under an untrusted storage layer can seal
/// with [`Self::aad`] as associated data so a ciphertext relocated into
/// another slot fails to decrypt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordBinding {
    /// Record owner
    pub owner: Account,
    /// Slot index within the owner's sequence
    pub index: u64,
    /// Record version the ciphertext belongs to
    pub version: u64,
}

impl RecordBinding {
    /// Canonical associated-data bytes for this slot and version.
    pub fn aad(&self) -> Vec<u8> {
        let mut aad = Vec::with_capacity(BINDING_AAD_LABEL.len() + 20 + 8 + 8);
        aad.extend_from_slice(BINDING_AAD_LABEL);
        aad.extend_from_slice(self.owner.as_bytes());
        aad.extend_from_slice(&self.index.to_be_bytes());
        aad.extend_from_slice(&self.version.to_be_bytes());
        aad
    }
}

/// The unit of storage: one journal entry owned by one account.
///
/// # Invariants
///
/// - `version >= 1`, increments by exactly 1 per update, frozen once deleted
/// - `deleted` only moves false → true
/// - `content_hash == ContentHash::of(ciphertext)`
/// - `owner` never appears in `delegates`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    owner: Account,
    index: u64,
    ciphertext: Vec<u8>,
    content_hash: ContentHash,
    version: u64,
    timestamp: Timestamp,
    deleted: bool,
    delegates: DelegateSet,
}

impl Record {
    /// First version of a new record.
    ///
    /// # Errors
    ///
    /// - `InvalidInput`: `ciphertext` is empty
    pub fn create(
        owner: Account,
        index: u64,
        ciphertext: Vec<u8>,
        timestamp: Timestamp,
    ) -> Result<Self, StoreError> {
        if ciphertext.is_empty() {
            return Err(StoreError::InvalidInput("ciphertext is empty".to_string()));
        }

        Ok(Self {
            owner,
            index,
            content_hash: ContentHash::of(&ciphertext),
            ciphertext,
            version: 1,
            timestamp,
            deleted: false,
            delegates: DelegateSet::new(),
        })
    }

    /// Owning account.
    pub fn owner(&self) -> Account {
        self.owner
    }

    /// Position in the owner's sequence.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Opaque ciphertext blob.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Digest of the current ciphertext.
    pub fn content_hash(&self) -> ContentHash {
        self.content_hash
    }

    /// Current version (1 on creation).
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Finalization time of the most recent create or update.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Whether the record has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Accounts holding a read grant.
    pub fn delegates(&self) -> &DelegateSet {
        &self.delegates
    }

    /// Slot identity at the current version.
    pub fn binding(&self) -> RecordBinding {
        RecordBinding { owner: self.owner, index: self.index, version: self.version }
    }

    /// Fingerprint bound to `(owner, index, version, content_hash)`.
    pub fn binding_digest(&self) -> ContentHash {
        let mut hasher = Sha256::new();
        hasher.update(BINDING_DIGEST_LABEL);
        hasher.update(self.owner.as_bytes());
        hasher.update(self.index.to_be_bytes());
        hasher.update(self.version.to_be_bytes());
        hasher.update(self.content_hash.as_bytes());
        ContentHash(hasher.finalize().into())
    }

    /// Read-side snapshot of this record.
    pub fn view(&self) -> RecordView {
        RecordView {
            owner: self.owner,
            index: self.index,
            ciphertext: self.ciphertext.clone(),
            timestamp: self.timestamp,
            version: self.version,
            content_hash: self.content_hash,
            deleted: self.deleted,
        }
    }

    /// Replace the ciphertext if `expected_version` is current.
    ///
    /// Returns the new version.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the record is deleted
    /// - `InvalidInput`: `ciphertext` is empty
    /// - `VersionConflict`: `expected_version` is stale
    pub fn update(
        &mut self,
        ciphertext: Vec<u8>,
        expected_version: u64,
        timestamp: Timestamp,
    ) -> Result<u64, StoreError> {
        if self.deleted {
            return Err(self.not_found());
        }

        if ciphertext.is_empty() {
            return Err(StoreError::InvalidInput("ciphertext is empty".to_string()));
        }

        if self.version != expected_version {
            return Err(StoreError::VersionConflict {
                owner: self.owner,
                index: self.index,
                expected: expected_version,
                actual: self.version,
            });
        }

        let next_version = self.version.checked_add(1).ok_or_else(|| {
            StoreError::InvalidInput(format!("version overflow for record {}", self.index))
        })?;

        self.content_hash = ContentHash::of(&ciphertext);
        self.ciphertext = ciphertext;
        self.version = next_version;
        self.timestamp = timestamp;

        debug_assert_eq!(self.content_hash, ContentHash::of(&self.ciphertext));
        Ok(self.version)
    }

    /// Soft-delete. Terminal.
    ///
    /// # Errors
    ///
    /// - `AlreadyDeleted`: the record was already deleted
    pub fn delete(&mut self) -> Result<(), StoreError> {
        if self.deleted {
            return Err(StoreError::AlreadyDeleted { owner: self.owner, index: self.index });
        }

        self.deleted = true;
        Ok(())
    }

    /// Add a read grant. Returns whether the set changed.
    ///
    /// Granting to the owner is a no-op.
    ///
    /// # Errors
    ///
    /// - `NotFound`: the record is deleted
    pub fn grant_delegate(&mut self, delegate: Account) -> Result<bool, StoreError> {
        if self.deleted {
            return Err(self.not_found());
        }

        if delegate == self.owner {
            return Ok(false);
        }

        Ok(self.delegates.grant(delegate))
    }

    /// Remove a read grant. Returns whether the set changed.
    ///
    /// Allowed on deleted records since it only narrows access.
    pub fn revoke_delegate(&mut self, delegate: Account) -> bool {
        self.delegates.revoke(&delegate)
    }

    fn not_found(&self) -> StoreError {
        StoreError::NotFound { owner: self.owner, index: self.index }
    }
}

/// What a permitted reader sees of a record:
/// `(ciphertext, timestamp, version, hash, deleted)` plus its address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordView {
    /// Record owner
    pub owner: Account,
    /// Slot index within the owner's sequence
    pub index: u64,
    /// Opaque ciphertext blob (an envelope, to the client)
    pub ciphertext: Vec<u8>,
    /// Finalization time of the last create/update
    pub timestamp: Timestamp,
    /// Current version
    pub version: u64,
    /// Digest of `ciphertext`
    pub content_hash: ContentHash,
    /// Soft-delete flag; deleted records stay readable
    pub deleted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: Account = Account::from_bytes([1; 20]);
    const OTHER: Account = Account::from_bytes([2; 20]);

    fn record() -> Record {
        Record::create(OWNER, 0, b"v1".to_vec(), Timestamp::At(100)).unwrap()
    }

    #[test]
    fn create_starts_at_version_one() {
        let record = record();

        assert_eq!(record.version(), 1);
        assert!(!record.is_deleted());
        assert!(record.delegates().is_empty());
        assert_eq!(record.content_hash(), ContentHash::of(b"v1"));
    }

    #[test]
    fn create_rejects_empty_ciphertext() {
        let result = Record::create(OWNER, 0, Vec::new(), Timestamp::At(0));
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));
    }

    #[test]
    fn update_increments_version_and_rehashes() {
        let mut record = record();

        let version = record.update(b"v2".to_vec(), 1, Timestamp::At(200)).unwrap();

        assert_eq!(version, 2);
        assert_eq!(record.ciphertext(), b"v2");
        assert_eq!(record.content_hash(), ContentHash::of(b"v2"));
        assert_eq!(record.timestamp(), Timestamp::At(200));
    }

    #[test]
    fn stale_update_leaves_record_unchanged() {
        let mut record = record();
        record.update(b"v2".to_vec(), 1, Timestamp::At(200)).unwrap();
        let before = record.clone();

        let result = record.update(b"v3".to_vec(), 1, Timestamp::At(300));

        assert_eq!(
            result,
            Err(StoreError::VersionConflict { owner: OWNER, index: 0, expected: 1, actual: 2 })
        );
        assert_eq!(record, before);
    }

    #[test]
    fn deleted_record_is_frozen() {
        let mut record = record();
        record.delete().unwrap();

        assert_eq!(
            record.update(b"v2".to_vec(), 1, Timestamp::At(1)),
            Err(StoreError::NotFound { owner: OWNER, index: 0 })
        );
        assert_eq!(record.delete(), Err(StoreError::AlreadyDeleted { owner: OWNER, index: 0 }));
        assert_eq!(record.version(), 1);
    }

    #[test]
    fn grant_to_owner_is_noop() {
        let mut record = record();
        assert_eq!(record.grant_delegate(OWNER), Ok(false));
        assert!(record.delegates().is_empty());
    }

    #[test]
    fn grant_and_revoke_are_idempotent() {
        let mut record = record();

        assert_eq!(record.grant_delegate(OTHER), Ok(true));
        assert_eq!(record.grant_delegate(OTHER), Ok(false));
        assert!(record.revoke_delegate(OTHER));
        assert!(!record.revoke_delegate(OTHER));
        assert_eq!(record.version(), 1);
    }

    #[test]
    fn delete_keeps_delegates_and_blocks_new_grants() {
        let mut record = record();
        record.grant_delegate(OTHER).unwrap();
        record.delete().unwrap();

        assert!(record.delegates().contains(&OTHER));
        assert!(matches!(
            record.grant_delegate(Account::from_bytes([3; 20])),
            Err(StoreError::NotFound { .. })
        ));
        assert!(record.revoke_delegate(OTHER));
    }

    #[test]
    fn binding_digest_depends_on_slot() {
        let a = Record::create(OWNER, 0, b"same".to_vec(), Timestamp::At(0)).unwrap();
        let b = Record::create(OWNER, 1, b"same".to_vec(), Timestamp::At(0)).unwrap();
        let c = Record::create(OTHER, 0, b"same".to_vec(), Timestamp::At(0)).unwrap();

        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.binding_digest(), b.binding_digest());
        assert_ne!(a.binding_digest(), c.binding_digest());
    }

    #[test]
    fn binding_aad_changes_with_version() {
        let mut record = record();
        let v1 = record.binding().aad();
        record.update(b"v2".to_vec(), 1, Timestamp::At(1)).unwrap();

        assert_ne!(v1, record.binding().aad());
    }

    #[test]
    fn unresolved_timestamp_is_not_zero() {
        assert_eq!(Timestamp::from_secs(None), Timestamp::Unresolved);
        assert_eq!(Timestamp::from_secs(Some(0)), Timestamp::At(0));
        assert_eq!(Timestamp::Unresolved.secs(), None);
        assert_eq!(Timestamp::Unresolved.to_string(), "unresolved");
    }
}
