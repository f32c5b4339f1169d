//! Deterministic simulation harness for inkvault.
//!
//! Seeded implementations of the [`Environment`](inkvault_core::Environment)
//! trait and the client's [`LedgerApi`](inkvault_client::LedgerApi). The
//! ledger's clocks and the keyring's salts and nonces all come from one
//! [`SimEnv`], so a whole journal session replays identically from a seed.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation of the record
//! store. Operations are applied to both the model and the real ledger, and
//! their outcomes and observable states are compared.
//!
//! # Invariant Testing
//!
//! The `invariants` module checks properties of persisted state that must
//! hold after any sequence of operations, independent of the model. Use
//! [`InvariantRegistry::standard()`] for the full set.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod model;
pub mod sim_env;
pub mod sim_ledger;

pub use invariants::{
    ContentHashMatches, ContiguousIndices, DeletedRecordsFrozen, EventLogComplete, Invariant,
    InvariantRegistry, InvariantResult, LedgerSnapshot, OwnerNeverDelegate, VersionMonotonicity,
    Violation,
};
pub use model::{
    AccountId, ErrorKind, ModelJournal, ModelRecord, NUM_ACCOUNTS, NUM_INDICES, Operation,
    OperationResult, SmallContent, VersionGuess, account,
};
pub use sim_env::{SimEnv, SimInstant};
pub use sim_ledger::SimLedger;
