//! Two-phase ledger hosting the record store.
//!
//! Callers submit transactions (phase 1) and later observe their finalization
//! (phase 2). Finalization applies queued transactions one at a time in
//! submission order; each sees every effect finalized before it, so there is
//! a single global order across all callers.
//!
//! ```text
//!  submit ──► pending queue ──finalize_next──► Sequencer ──► RecordStore
//!                                                 │             │
//!                                               height        outcome
//!                                                 └──► Receipt ◄┘
//! ```
//!
//! Reads go straight to finalized state. A read issued after `submit` but
//! before finalization does not see the submitted change.

use std::{
    collections::{BTreeMap, VecDeque},
    fmt,
    time::Duration,
};

use inkvault_core::{
    Account, CallContext, Environment, EventCursor, RecordView, SequencedEvent, StoreError,
    Timestamp,
};

use crate::{
    config::LedgerConfig,
    error::LedgerError,
    feed::{Delivery, EventFilter, NotificationFeed, SubscriptionId},
    sequencer::Sequencer,
    storage::Storage,
    store::RecordStore,
};

/// Identifier handed out at submission.
///
/// Unique within one ledger process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxId(pub u64);

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx#{}", self.0)
    }
}

/// A state-changing operation. Always executes as the submitting caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// Append a record
    Create {
        /// Envelope bytes
        ciphertext: Vec<u8>,
    },
    /// Replace a record's ciphertext under optimistic concurrency
    Update {
        /// Record index in the caller's namespace
        index: u64,
        /// Replacement envelope bytes
        ciphertext: Vec<u8>,
        /// Version the edit is based on
        expected_version: u64,
    },
    /// Soft-delete a record
    Delete {
        /// Record index in the caller's namespace
        index: u64,
    },
    /// Give an account read access to one record
    GrantDelegate {
        /// Record index in the caller's namespace
        index: u64,
        /// Account receiving access
        delegate: Account,
    },
    /// Withdraw an account's read access to one record
    RevokeDelegate {
        /// Record index in the caller's namespace
        index: u64,
        /// Account losing access
        delegate: Account,
    },
}

impl Call {
    fn kind(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Update { .. } => "update",
            Self::Delete { .. } => "delete",
            Self::GrantDelegate { .. } => "grant_delegate",
            Self::RevokeDelegate { .. } => "revoke_delegate",
        }
    }
}

/// Result of a successfully applied [`Call`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallOutput {
    /// Record appended at `index`
    Created {
        /// Assigned index
        index: u64,
    },
    /// Record now at `version`
    Updated {
        /// New version
        version: u64,
    },
    /// Record soft-deleted
    Deleted,
    /// Grant applied; `changed` is false for a no-op
    DelegateGranted {
        /// Whether the delegate set changed
        changed: bool,
    },
    /// Revoke applied; `changed` is false for a no-op
    DelegateRevoked {
        /// Whether the delegate set changed
        changed: bool,
    },
}

/// Finalization record of one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    /// Transaction this receipt is for
    pub tx_id: TxId,
    /// Submitting account
    pub caller: Account,
    /// Position in the global order
    pub height: u64,
    /// Finalization time stamped onto any write
    pub timestamp: Timestamp,
    /// Applied output, or why the transaction was rejected with no effect
    pub outcome: Result<CallOutput, StoreError>,
}

struct PendingCall<I> {
    tx_id: TxId,
    caller: Account,
    call: Call,
    submitted_at: I,
}

/// Ledger: pending queue, sequencer, record store and notification feed.
pub struct Ledger<E: Environment, S: Storage> {
    env: E,
    store: RecordStore<S>,
    sequencer: Sequencer,
    feed: NotificationFeed<S>,
    pending: VecDeque<PendingCall<E::Instant>>,
    receipts: BTreeMap<TxId, Receipt>,
    next_tx: u64,
    max_pending: usize,
    receipt_retention: usize,
}

impl<E: Environment, S: Storage> Ledger<E, S> {
    /// Open a ledger over `storage`, recovering the sequencer.
    ///
    /// # Errors
    ///
    /// Returns error if recovery reads fail.
    pub fn open(env: E, storage: S, config: &LedgerConfig) -> Result<Self, LedgerError> {
        let mut sequencer = Sequencer::new();
        let next_height = sequencer.initialize(&storage)?;
        let events = storage.event_count()?;

        tracing::info!(next_height, events, "Ledger opened");

        Ok(Self {
            env,
            store: RecordStore::new(storage.clone(), config.access, config.max_ciphertext_len),
            sequencer,
            feed: NotificationFeed::new(storage, config.feed_capacity),
            pending: VecDeque::new(),
            receipts: BTreeMap::new(),
            next_tx: 0,
            max_pending: config.max_pending.max(1),
            receipt_retention: config.receipt_retention,
        })
    }

    /// Queue `call` for execution as `caller` (phase 1).
    ///
    /// # Errors
    ///
    /// - `Backpressure`: the pending queue is full
    pub fn submit(&mut self, caller: Account, call: Call) -> Result<TxId, LedgerError> {
        if self.pending.len() >= self.max_pending {
            tracing::warn!(caller = %caller, pending = self.pending.len(), "Submission refused");
            return Err(LedgerError::Backpressure { max_pending: self.max_pending });
        }

        let tx_id = TxId(self.next_tx);
        self.next_tx += 1;

        tracing::debug!(tx = %tx_id, caller = %caller, kind = call.kind(), "Transaction submitted");
        let submitted_at = self.env.now();
        self.pending.push_back(PendingCall { tx_id, caller, call, submitted_at });

        Ok(tx_id)
    }

    /// Number of submitted, not yet finalized transactions.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// How long the oldest pending transaction has been waiting.
    pub fn oldest_pending_age(&self) -> Option<Duration> {
        self.pending.front().map(|pending| self.env.now() - pending.submitted_at)
    }

    /// Finalize the oldest pending transaction (phase 2).
    ///
    /// Returns `None` when nothing is pending. A transaction the store
    /// rejects still finalizes, with the error as its outcome.
    ///
    /// # Errors
    ///
    /// - `Sequencer`: no height could be reserved; the transaction stays at
    ///   the head of the queue
    pub fn finalize_next(&mut self) -> Result<Option<Receipt>, LedgerError> {
        if self.pending.is_empty() {
            return Ok(None);
        }

        let height = self.sequencer.reserve(self.store.storage()).map_err(|e| {
            tracing::error!(error = %e, "Failed to reserve ledger height");
            e
        })?;

        let Some(PendingCall { tx_id, caller, call, submitted_at }) = self.pending.pop_front()
        else {
            return Ok(None);
        };
        let queued_ms = (self.env.now() - submitted_at).as_millis();

        let timestamp = Timestamp::from_secs(self.env.wall_clock_secs());
        let ctx = CallContext::new(caller, timestamp);
        let kind = call.kind();

        let outcome = self.apply(&ctx, call);

        match &outcome {
            Ok(output) => {
                tracing::debug!(
                    tx = %tx_id,
                    height,
                    caller = %caller,
                    kind,
                    queued_ms,
                    ?output,
                    "Finalized"
                );
            },
            Err(StoreError::Storage(e)) => {
                tracing::error!(
                    tx = %tx_id,
                    height,
                    caller = %caller,
                    kind,
                    error = %e,
                    "Storage failure"
                );
            },
            Err(e) => {
                tracing::warn!(
                    tx = %tx_id,
                    height,
                    caller = %caller,
                    kind,
                    queued_ms,
                    error = %e,
                    "Rejected"
                );
            },
        }

        let receipt = Receipt { tx_id, caller, height, timestamp, outcome };
        self.retain_receipt(receipt.clone());

        Ok(Some(receipt))
    }

    /// Finalize every pending transaction in order.
    ///
    /// Stops at the first sequencing failure, returning receipts produced so
    /// far alongside the error.
    pub fn finalize_all(&mut self) -> (Vec<Receipt>, Option<LedgerError>) {
        let mut receipts = Vec::with_capacity(self.pending.len());

        loop {
            match self.finalize_next() {
                Ok(Some(receipt)) => receipts.push(receipt),
                Ok(None) => return (receipts, None),
                Err(e) => return (receipts, Some(e)),
            }
        }
    }

    /// Look up a finalized transaction's receipt.
    ///
    /// `None` if still pending, unknown, or evicted from retention.
    pub fn receipt(&self, tx_id: TxId) -> Option<&Receipt> {
        self.receipts.get(&tx_id)
    }

    /// Read one record as `caller`.
    pub fn read(
        &self,
        caller: Account,
        owner: Account,
        index: u64,
    ) -> Result<RecordView, StoreError> {
        self.store.read(&self.read_context(caller), owner, index)
    }

    /// Read every record of `owner` as `caller`.
    pub fn read_all(&self, caller: Account, owner: Account) -> Result<Vec<RecordView>, StoreError> {
        self.store.read_all(&self.read_context(caller), owner)
    }

    /// Number of records `owner` has created.
    pub fn record_count(&self, owner: Account) -> Result<u64, StoreError> {
        self.store.record_count(owner)
    }

    /// Delegates of `owner`'s record `index`, as seen by `caller`.
    pub fn delegates(
        &self,
        caller: Account,
        owner: Account,
        index: u64,
    ) -> Result<Vec<Account>, StoreError> {
        self.store.delegates(&self.read_context(caller), owner, index)
    }

    /// Register a push subscription on the creation feed.
    pub fn subscribe(&mut self, filter: EventFilter) -> SubscriptionId {
        self.feed.subscribe(filter)
    }

    /// Drop a push subscription.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.feed.unsubscribe(id)
    }

    /// Take queued events for a subscription.
    pub fn drain(&mut self, id: SubscriptionId) -> Option<Delivery> {
        self.feed.drain(id)
    }

    /// Read the durable creation log from `cursor`.
    pub fn events_since(
        &self,
        cursor: EventCursor,
        filter: EventFilter,
        limit: usize,
    ) -> Result<(Vec<SequencedEvent>, EventCursor), LedgerError> {
        Ok(self.feed.events_since(cursor, filter, limit)?)
    }

    /// Environment the ledger stamps time from.
    pub fn env(&self) -> &E {
        &self.env
    }

    fn apply(&mut self, ctx: &CallContext, call: Call) -> Result<CallOutput, StoreError> {
        match call {
            Call::Create { ciphertext } => {
                let event = self.store.create(ctx, ciphertext)?;
                let index = event.event.index;
                self.feed.publish(&event);
                Ok(CallOutput::Created { index })
            },
            Call::Update { index, ciphertext, expected_version } => self
                .store
                .update(ctx, index, ciphertext, expected_version)
                .map(|version| CallOutput::Updated { version }),
            Call::Delete { index } => self.store.delete(ctx, index).map(|()| CallOutput::Deleted),
            Call::GrantDelegate { index, delegate } => self
                .store
                .grant_delegate(ctx, index, delegate)
                .map(|changed| CallOutput::DelegateGranted { changed }),
            Call::RevokeDelegate { index, delegate } => self
                .store
                .revoke_delegate(ctx, index, delegate)
                .map(|changed| CallOutput::DelegateRevoked { changed }),
        }
    }

    fn retain_receipt(&mut self, receipt: Receipt) {
        if self.receipt_retention == 0 {
            return;
        }

        self.receipts.insert(receipt.tx_id, receipt);
        while self.receipts.len() > self.receipt_retention {
            self.receipts.pop_first();
        }
    }

    fn read_context(&self, caller: Account) -> CallContext {
        CallContext::new(caller, Timestamp::from_secs(self.env.wall_clock_secs()))
    }
}
