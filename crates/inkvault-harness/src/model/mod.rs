//! Reference model for model-based testing.
//!
//! [`ModelJournal`] is a deliberately naive record store: plain vectors, no
//! storage layer, no ledger. Feeding the same [`Operation`] sequence to it
//! and to the real ledger must produce the same outcomes and the same
//! readable state.

mod journal;
mod operation;

pub use journal::{ModelJournal, ModelRecord};
pub use operation::{
    AccountId, ErrorKind, NUM_ACCOUNTS, NUM_INDICES, Operation, OperationResult, SmallContent,
    VersionGuess, account,
};
