//! Storage error types.
//!
//! - `NotFound`: overwrite targeted a slot that was never appended
//! - `Conflict`: append position does not match the persisted length
//! - `Serialization`: failed to encode/decode a stored value
//! - `Io`: underlying storage system errors

use inkvault_core::{Account, StoreError};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Record slot does not exist
    #[error("record not found: owner {owner}, index {index}")]
    NotFound {
        /// Namespace searched
        owner: Account,
        /// Missing index
        index: u64,
    },

    /// Append position conflict (gap or duplicate in a sequence)
    ///
    /// Occurs when appending a record at an index other than the owner's
    /// current count, or an event at a sequence other than the log length.
    #[error("append conflict: expected {expected}, got {got}")]
    Conflict {
        /// Expected position (current length)
        expected: u64,
        /// Provided position
        got: u64,
    },

    /// Serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error (file system, database, etc.)
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<StorageError> for StoreError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}
