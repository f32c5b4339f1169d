//! Inkvault ledger.
//!
//! The ledger-resident half of the journal: a versioned record store with
//! per-record delegation, hosted by a two-phase ledger that finalizes one
//! transaction at a time in a single global order.
//!
//! # Components
//!
//! - [`RecordStore`]: per-owner record sequences, optimistic concurrency, soft
//!   delete and delegate grants over a [`Storage`] backend
//! - [`Sequencer`]: monotonic ledger heights, recovered from storage
//! - [`Ledger`]: pending queue plus finalization, producing [`Receipt`]s
//! - [`NotificationFeed`]: creation events by subscription or cursor
//! - [`LedgerService`]: async handle with a background finalizer
//! - [`SystemEnv`]: production environment (real time, crypto RNG)
//!
//! # Storage
//!
//! [`MemoryStorage`] for tests and simulation, [`RedbStorage`] for durable
//! use, [`ChaoticStorage`] to inject failures into either.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod error;
pub mod feed;
pub mod ledger;
pub mod sequencer;
mod service;
pub mod storage;
pub mod store;
mod system_env;

pub use config::LedgerConfig;
pub use error::LedgerError;
pub use feed::{Delivery, EventFilter, NotificationFeed, SubscriptionId};
pub use ledger::{Call, CallOutput, Ledger, Receipt, TxId};
pub use sequencer::{Sequencer, SequencerError};
pub use service::{LedgerService, PendingTx};
pub use storage::{ChaoticStorage, MemoryStorage, RedbStorage, Storage, StorageError};
pub use store::{DEFAULT_MAX_CIPHERTEXT_LEN, RecordStore};
pub use system_env::SystemEnv;
