//! Ledger error types.

use inkvault_core::StoreError;
use thiserror::Error;

use crate::{ledger::TxId, sequencer::SequencerError, storage::StorageError};

/// Errors from the ledger and its service handle.
///
/// A rejected transaction is not an error here: it finalizes with a
/// [`StoreError`] outcome in its receipt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Pending queue is full; the submission was not accepted
    #[error("pending queue full ({max_pending} transactions)")]
    Backpressure {
        /// Configured queue bound
        max_pending: usize,
    },

    /// No receipt within the finalization timeout
    ///
    /// The outcome is unknown: the transaction may still finalize. Look it
    /// up by id before resubmitting.
    #[error("transaction {tx_id} not finalized in time")]
    Timeout {
        /// Transaction awaited
        tx_id: TxId,
    },

    /// Service stopped before the transaction finalized
    #[error("ledger service shut down")]
    Shutdown,

    /// Height assignment failed; the transaction stays queued
    #[error("sequencer error: {0}")]
    Sequencer(#[from] SequencerError),

    /// Direct storage access failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Read query rejected by the record store
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Whether the caller may retry the same request later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Backpressure { .. } | Self::Sequencer(_) | Self::Storage(_) => true,
            Self::Store(e) => e.is_retryable(),
            Self::Timeout { .. } | Self::Shutdown => false,
        }
    }
}
