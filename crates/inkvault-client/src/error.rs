//! Client error types.

use inkvault_core::StoreError;
use inkvault_crypto::EnvelopeError;
use inkvault_ledger::LedgerError;
use thiserror::Error;

use crate::client::Entry;

/// Errors surfaced by [`crate::JournalClient`] and [`crate::Keyring`].
#[derive(Error, Debug)]
pub enum ClientError {
    /// Rejected locally before anything was sent
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Envelope could not be built or opened
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// Record store rejected the request
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Ledger did not produce an outcome (backpressure, timeout, shutdown)
    #[error(transparent)]
    Ledger(LedgerError),

    /// Someone else updated the entry since it was read.
    ///
    /// Nothing was written. `remote` is the entry as it stands now; the
    /// caller decides whether to retry on top of it or discard `local`.
    #[error("entry {index} changed remotely (now at version {})", remote.version)]
    Conflict {
        /// Entry index
        index: u64,
        /// Text the caller tried to write
        local: String,
        /// Current remote state
        remote: Box<Entry>,
    },

    /// Stored bytes are not a UTF-8 envelope, or plaintext is not UTF-8
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Receipt carried an output that does not match the submitted call
    #[error("unexpected ledger output: {0}")]
    UnexpectedOutput(String),
}

impl From<LedgerError> for ClientError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Store(e) => Self::Store(e),
            other => Self::Ledger(other),
        }
    }
}

impl ClientError {
    /// Whether the same operation may succeed if tried again.
    ///
    /// Conflicts are not retryable as-is: the caller must look at the remote
    /// entry first.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store(e) => e.is_retryable() && !matches!(e, StoreError::VersionConflict { .. }),
            Self::Ledger(e) => e.is_retryable(),
            Self::InvalidInput(_)
            | Self::Envelope(_)
            | Self::Conflict { .. }
            | Self::Encoding(_)
            | Self::UnexpectedOutput(_) => false,
        }
    }
}
