//! Inkvault journal client.
//!
//! Everything that happens on the writer's side of the ledger: turning a
//! password into keys, sealing entry text into envelopes before it leaves the
//! process, opening envelopes that come back, and surfacing version conflicts
//! instead of silently overwriting a concurrent edit.
//!
//! # Architecture
//!
//! ```text
//! JournalClient
//!     │  text ──► Keyring::encrypt ──► envelope bytes
//!     ▼
//! LedgerApi (async trait) ──► LedgerService / test doubles
//!     │
//!     ▼
//! Receipt / RecordView ──► Keyring::decrypt ──► Entry (or Listed::Locked)
//! ```
//!
//! The ledger only ever sees ciphertext. Plaintext and the password stay in
//! this crate and are wiped when the session ends.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod api;
mod client;
mod error;
mod keyring;

pub use api::LedgerApi;
pub use client::{Entry, EntryOrder, JournalClient, Listed};
pub use error::ClientError;
pub use keyring::{Keyring, MAX_CACHED_KEYS};
