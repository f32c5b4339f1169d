//! Operations for model-based testing.
//!
//! Generated by proptest (or `arbitrary` in fuzzing) and applied to both the
//! model and the real ledger.

use arbitrary::Arbitrary;
use inkvault_core::{Account, RecordView, StoreError};
use inkvault_ledger::{Call, CallOutput};

use super::journal::ModelJournal;

/// Account identifier, folded onto a small fixed population.
pub type AccountId = u8;

/// Number of distinct accounts operations address.
pub const NUM_ACCOUNTS: u8 = 3;

/// Number of distinct indices operations address per owner.
pub const NUM_INDICES: u8 = 4;

/// Concrete account for an [`AccountId`].
pub fn account(id: AccountId) -> Account {
    Account::from_bytes([0xA0 + id % NUM_ACCOUNTS; 20])
}

/// Actions a test can take against the journal.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Caller creates a record in its own namespace
    Create {
        /// Submitting account
        caller: AccountId,
        /// Ciphertext to store
        content: SmallContent,
    },

    /// Caller updates one of its records
    Update {
        /// Submitting account
        caller: AccountId,
        /// Target index
        index: u8,
        /// Replacement ciphertext
        content: SmallContent,
        /// Which version the update claims to be based on
        guess: VersionGuess,
    },

    /// Caller soft-deletes one of its records
    Delete {
        /// Submitting account
        caller: AccountId,
        /// Target index
        index: u8,
    },

    /// Caller grants read access on one of its records
    Grant {
        /// Submitting account
        caller: AccountId,
        /// Target index
        index: u8,
        /// Account gaining access
        delegate: AccountId,
    },

    /// Caller revokes read access on one of its records
    Revoke {
        /// Submitting account
        caller: AccountId,
        /// Target index
        index: u8,
        /// Account losing access
        delegate: AccountId,
    },

    /// Caller reads one record of `owner`
    Read {
        /// Reading account
        caller: AccountId,
        /// Namespace read from
        owner: AccountId,
        /// Target index
        index: u8,
    },

    /// Caller reads every record of `owner`
    ReadAll {
        /// Reading account
        caller: AccountId,
        /// Namespace read from
        owner: AccountId,
    },

    /// Advance simulated time
    AdvanceTime {
        /// Seconds to advance
        secs: u16,
    },

    /// Toggle whether the wall clock can be read
    SetWallClock {
        /// Readable after this operation
        resolved: bool,
    },
}

/// Expected version an update carries, relative to the record's actual one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub enum VersionGuess {
    /// The current version (succeeds if nothing else is wrong)
    Current,
    /// One behind (a lost race)
    Stale,
    /// One ahead (never valid)
    Ahead,
}

/// Small ciphertext description.
///
/// Size class 0 is empty and class 3 exceeds the size limit tests run with,
/// so both rejection paths get exercised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub struct SmallContent {
    /// Byte pattern seed
    pub seed: u8,
    /// Length class (0-3 maps to empty/small/medium/oversize)
    pub size_class: u8,
}

impl SmallContent {
    /// Size limit the oversize class is designed to exceed.
    pub const MAX_LEN: usize = 128;

    /// Expand to ciphertext bytes.
    pub fn to_bytes(self) -> Vec<u8> {
        let len = match self.size_class % 4 {
            0 => 0,
            1 => 8,
            2 => 64,
            _ => Self::MAX_LEN + 1,
        };

        (0..len).map(|i| self.seed.wrapping_add(i as u8)).collect()
    }
}

impl Operation {
    /// The ledger call this operation submits, if it is a mutation.
    ///
    /// Version guesses are resolved against `model`, which must be in sync
    /// with the real system for the comparison to mean anything.
    pub fn to_call(&self, model: &ModelJournal) -> Option<(Account, Call)> {
        match *self {
            Self::Create { caller, content } => {
                Some((account(caller), Call::Create { ciphertext: content.to_bytes() }))
            },
            Self::Update { caller, index, content, guess } => {
                let owner = account(caller);
                let index = u64::from(index % NUM_INDICES);
                let current = model.record(owner, index).map_or(1, |r| r.version);
                let expected_version = match guess {
                    VersionGuess::Current => current,
                    VersionGuess::Stale => current.saturating_sub(1),
                    VersionGuess::Ahead => current + 1,
                };
                let ciphertext = content.to_bytes();
                Some((owner, Call::Update { index, ciphertext, expected_version }))
            },
            Self::Delete { caller, index } => {
                Some((account(caller), Call::Delete { index: u64::from(index % NUM_INDICES) }))
            },
            Self::Grant { caller, index, delegate } => Some((
                account(caller),
                Call::GrantDelegate {
                    index: u64::from(index % NUM_INDICES),
                    delegate: account(delegate),
                },
            )),
            Self::Revoke { caller, index, delegate } => Some((
                account(caller),
                Call::RevokeDelegate {
                    index: u64::from(index % NUM_INDICES),
                    delegate: account(delegate),
                },
            )),
            Self::Read { .. }
            | Self::ReadAll { .. }
            | Self::AdvanceTime { .. }
            | Self::SetWallClock { .. } => None,
        }
    }
}

/// Outcome of one operation, comparable between model and real system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Mutation applied
    Output(CallOutput),
    /// Read succeeded
    Views(Vec<RecordView>),
    /// Environment-only operation
    Done,
    /// Rejected with no effect
    Rejected(ErrorKind),
}

/// Rejection reason without the payload, for cross-implementation compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed argument
    InvalidInput,
    /// Missing record, or a mutation on a deleted one
    NotFound,
    /// Read without a grant
    Unauthorized,
    /// Stale expected version
    VersionConflict,
    /// Second delete
    AlreadyDeleted,
    /// Backend failure
    Storage,
}

impl From<&StoreError> for ErrorKind {
    fn from(err: &StoreError) -> Self {
        match err {
            StoreError::InvalidInput(_) => Self::InvalidInput,
            StoreError::NotFound { .. } => Self::NotFound,
            StoreError::Unauthorized { .. } => Self::Unauthorized,
            StoreError::VersionConflict { .. } => Self::VersionConflict,
            StoreError::AlreadyDeleted { .. } => Self::AlreadyDeleted,
            StoreError::Storage(_) => Self::Storage,
        }
    }
}

impl OperationResult {
    /// Fold a store result into a comparable outcome.
    pub fn from_store<T>(
        result: Result<T, StoreError>,
        wrap: impl FnOnce(T) -> Self,
    ) -> Self {
        match result {
            Ok(value) => wrap(value),
            Err(e) => Self::Rejected(ErrorKind::from(&e)),
        }
    }

    /// Whether the operation was applied.
    pub fn is_ok(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_size_classes() {
        let len = |size_class| SmallContent { seed: 1, size_class }.to_bytes().len();

        assert_eq!(len(0), 0);
        assert_eq!(len(1), 8);
        assert_eq!(len(2), 64);
        assert!(len(3) > SmallContent::MAX_LEN);
        assert_eq!(len(5), 8);
    }

    #[test]
    fn account_ids_fold_onto_population() {
        assert_eq!(account(0), account(NUM_ACCOUNTS));
        assert_ne!(account(0), account(1));
    }

    #[test]
    fn ahead_guess_resolves_against_model() {
        let model = ModelJournal::new(Default::default(), SmallContent::MAX_LEN);
        let op = Operation::Update {
            caller: 0,
            index: 0,
            content: SmallContent { seed: 0, size_class: 1 },
            guess: VersionGuess::Ahead,
        };

        let Some((_, Call::Update { expected_version, .. })) = op.to_call(&model) else {
            unreachable!("update maps to an update call");
        };
        assert_eq!(expected_version, 2);
    }
}
