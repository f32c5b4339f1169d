//! Inkvault core domain
//!
//! Sans-IO types shared by the record store, the ledger that hosts it, and
//! the client that talks to it. Nothing here performs I/O or reads a clock;
//! time and randomness come in through [`env::Environment`] and caller
//! identity through [`CallContext`].
//!
//! # Record Lifecycle
//!
//! ```text
//!  create ──► Active(v=1) ──update──► Active(v+1) ──update──► ...
//!                 │                        │
//!                 └────────delete──────────┴──► Deleted (terminal, frozen)
//! ```
//!
//! Every record belongs to exactly one owner forever. Only the owner moves a
//! record between states or edits its delegate set; other accounts read, and
//! only while they hold a delegate grant.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod access;
pub mod account;
pub mod context;
pub mod env;
pub mod error;
pub mod event;
pub mod record;

pub use access::{Access, AccessPolicy, DelegateSet, DeletedRecordAccess};
pub use account::{ACCOUNT_LEN, Account, AccountParseError};
pub use context::CallContext;
pub use env::Environment;
pub use error::StoreError;
pub use event::{EventCursor, RecordCreated, SequencedEvent};
pub use record::{ContentHash, Record, RecordBinding, RecordView, Timestamp};
