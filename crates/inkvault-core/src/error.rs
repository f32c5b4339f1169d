//! Record store errors.

use thiserror::Error;

use crate::account::Account;

/// Errors from record store operations.
///
/// Every failed operation leaves the store unchanged.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Argument rejected at the boundary (empty or oversized ciphertext)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No such record, or the record is deleted and the operation needs it live
    #[error("record {owner}/{index} not found")]
    NotFound {
        /// Namespace searched
        owner: Account,
        /// Requested index
        index: u64,
    },

    /// Caller is neither owner nor an active delegate
    #[error("{caller} may not read record {owner}/{index}")]
    Unauthorized {
        /// Account that attempted the read
        caller: Account,
        /// Record owner
        owner: Account,
        /// Record index
        index: u64,
    },

    /// Optimistic concurrency check failed
    #[error("version conflict on {owner}/{index}: expected {expected}, current {actual}")]
    VersionConflict {
        /// Record owner
        owner: Account,
        /// Record index
        index: u64,
        /// Version the caller based its edit on
        expected: u64,
        /// Version actually stored
        actual: u64,
    },

    /// Delete called on an already-deleted record
    #[error("record {owner}/{index} already deleted")]
    AlreadyDeleted {
        /// Record owner
        owner: Account,
        /// Record index
        index: u64,
    },

    /// Persistent storage failed
    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    /// Whether retrying (possibly after re-reading) could succeed.
    ///
    /// Version conflicts succeed after a refresh; storage failures may be
    /// transient. Everything else is a permanent answer for the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::VersionConflict { .. } | Self::Storage(_))
    }
}
