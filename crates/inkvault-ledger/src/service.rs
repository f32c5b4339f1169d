//! Async service handle over a [`Ledger`].
//!
//! Owns the ledger behind a tokio mutex and runs a background finalizer that
//! drains the pending queue every `finalize_interval`. Submitters get a
//! [`PendingTx`] back immediately and await its receipt separately, which is
//! the two-phase protocol callers see:
//!
//! ```text
//!  submit().await ──► PendingTx ──finalized().await──► Receipt
//!                                        │
//!                                   (timeout) ──► LedgerError::Timeout
//! ```
//!
//! Nothing is retried internally. A timed-out transaction may still finalize;
//! [`LedgerService::receipt`] tells the caller what happened.

use std::{collections::HashMap, sync::Arc, time::Duration};

use inkvault_core::{Account, Environment, EventCursor, RecordView, SequencedEvent};
use tokio::{
    sync::{Mutex, Notify, oneshot, watch},
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};

use crate::{
    config::LedgerConfig,
    error::LedgerError,
    feed::{Delivery, EventFilter, SubscriptionId},
    ledger::{Call, CallOutput, Ledger, Receipt, TxId},
    storage::Storage,
};

/// Cloneable async handle to a running ledger.
pub struct LedgerService<E: Environment, S: Storage> {
    core: Arc<Core<E, S>>,
    shutdown: Arc<watch::Sender<bool>>,
    finalizer: Arc<Mutex<Option<JoinHandle<()>>>>,
    finalize_timeout: Duration,
}

impl<E: Environment, S: Storage> Clone for LedgerService<E, S> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
            shutdown: Arc::clone(&self.shutdown),
            finalizer: Arc::clone(&self.finalizer),
            finalize_timeout: self.finalize_timeout,
        }
    }
}

struct Core<E: Environment, S: Storage> {
    state: Mutex<State<E, S>>,
    events_ready: Notify,
}

struct State<E: Environment, S: Storage> {
    ledger: Ledger<E, S>,
    waiters: HashMap<TxId, oneshot::Sender<Receipt>>,
    closed: bool,
}

/// A submitted transaction awaiting finalization.
#[derive(Debug)]
pub struct PendingTx {
    tx_id: TxId,
    receipt: oneshot::Receiver<Receipt>,
    timeout: Duration,
}

impl PendingTx {
    /// Id assigned at submission.
    pub fn tx_id(&self) -> TxId {
        self.tx_id
    }

    /// Wait for the receipt.
    ///
    /// # Errors
    ///
    /// - `Timeout`: no receipt within the configured bound
    /// - `Shutdown`: the service stopped first
    pub async fn finalized(self) -> Result<Receipt, LedgerError> {
        match tokio::time::timeout(self.timeout, self.receipt).await {
            Ok(Ok(receipt)) => Ok(receipt),
            Ok(Err(_)) => Err(LedgerError::Shutdown),
            Err(_) => {
                tracing::warn!(tx = %self.tx_id, "Finalization timed out");
                Err(LedgerError::Timeout { tx_id: self.tx_id })
            },
        }
    }
}

impl<E: Environment, S: Storage> LedgerService<E, S> {
    /// Take ownership of `ledger` and start the background finalizer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(ledger: Ledger<E, S>, config: &LedgerConfig) -> Self {
        let core = Arc::new(Core {
            state: Mutex::new(State { ledger, waiters: HashMap::new(), closed: false }),
            events_ready: Notify::new(),
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let interval = config.finalize_interval();
        let handle = tokio::spawn(run_finalizer(Arc::clone(&core), interval, shutdown_rx));

        tracing::info!(
            interval_ms = interval.as_millis() as u64,
            timeout_ms = config.finalize_timeout_ms,
            "Ledger service started"
        );

        Self {
            core,
            shutdown: Arc::new(shutdown_tx),
            finalizer: Arc::new(Mutex::new(Some(handle))),
            finalize_timeout: config.finalize_timeout(),
        }
    }

    /// Queue `call` as `caller` and return a handle to await finalization.
    ///
    /// # Errors
    ///
    /// - `Backpressure`: pending queue full
    /// - `Shutdown`: service stopped
    pub async fn submit(&self, caller: Account, call: Call) -> Result<PendingTx, LedgerError> {
        let mut state = self.core.state.lock().await;
        if state.closed {
            return Err(LedgerError::Shutdown);
        }

        let tx_id = state.ledger.submit(caller, call)?;
        let (sender, receipt) = oneshot::channel();
        state.waiters.insert(tx_id, sender);

        Ok(PendingTx { tx_id, receipt, timeout: self.finalize_timeout })
    }

    /// Submit and wait for the receipt in one step.
    pub async fn execute(&self, caller: Account, call: Call) -> Result<Receipt, LedgerError> {
        self.submit(caller, call).await?.finalized().await
    }

    /// Receipt of a finalized transaction, if still retained.
    pub async fn receipt(&self, tx_id: TxId) -> Option<Receipt> {
        self.core.state.lock().await.ledger.receipt(tx_id).cloned()
    }

    /// Read one record as `caller` from finalized state.
    pub async fn read(
        &self,
        caller: Account,
        owner: Account,
        index: u64,
    ) -> Result<RecordView, LedgerError> {
        Ok(self.core.state.lock().await.ledger.read(caller, owner, index)?)
    }

    /// Read every record of `owner` as `caller` from finalized state.
    pub async fn read_all(
        &self,
        caller: Account,
        owner: Account,
    ) -> Result<Vec<RecordView>, LedgerError> {
        Ok(self.core.state.lock().await.ledger.read_all(caller, owner)?)
    }

    /// Number of records `owner` has created.
    pub async fn record_count(&self, owner: Account) -> Result<u64, LedgerError> {
        Ok(self.core.state.lock().await.ledger.record_count(owner)?)
    }

    /// Delegates of `owner`'s record `index`, as seen by `caller`.
    pub async fn delegates(
        &self,
        caller: Account,
        owner: Account,
        index: u64,
    ) -> Result<Vec<Account>, LedgerError> {
        Ok(self.core.state.lock().await.ledger.delegates(caller, owner, index)?)
    }

    /// Register a push subscription on the creation feed.
    pub async fn subscribe(&self, filter: EventFilter) -> SubscriptionId {
        self.core.state.lock().await.ledger.subscribe(filter)
    }

    /// Drop a push subscription.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.core.state.lock().await.ledger.unsubscribe(id)
    }

    /// Wait until at least one event or lag notice is queued for `id`.
    ///
    /// Returns `None` for an unknown subscription or once the service stops.
    pub async fn next_delivery(&self, id: SubscriptionId) -> Option<Delivery> {
        loop {
            let notified = self.core.events_ready.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.core.state.lock().await;
                if state.closed {
                    return None;
                }

                let delivery = state.ledger.drain(id)?;
                if !delivery.events.is_empty() || delivery.lagged > 0 {
                    return Some(delivery);
                }
            }

            notified.await;
        }
    }

    /// Read the durable creation log from `cursor`.
    pub async fn events_since(
        &self,
        cursor: EventCursor,
        filter: EventFilter,
        limit: usize,
    ) -> Result<(Vec<SequencedEvent>, EventCursor), LedgerError> {
        self.core.state.lock().await.ledger.events_since(cursor, filter, limit)
    }

    /// Stop the finalizer and fail every outstanding waiter with `Shutdown`.
    ///
    /// Transactions still pending are discarded unapplied.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);

        let handle = self.finalizer.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Finalizer task failed");
            }
        }
    }
}

impl<E: Environment, S: Storage> Core<E, S> {
    async fn finalize_pending(&self) {
        let mut state = self.state.lock().await;
        if state.ledger.pending_len() == 0 {
            return;
        }

        let (receipts, error) = state.ledger.finalize_all();
        if let Some(e) = error {
            let pending = state.ledger.pending_len();
            tracing::warn!(error = %e, pending, "Finalization stalled");
        }

        let created = receipts.iter().any(|r| matches!(r.outcome, Ok(CallOutput::Created { .. })));

        for receipt in receipts {
            if let Some(waiter) = state.waiters.remove(&receipt.tx_id) {
                // Submitter may have timed out and dropped its handle
                let _ = waiter.send(receipt);
            }
        }
        drop(state);

        if created {
            self.events_ready.notify_waiters();
        }
    }

    async fn close(&self) {
        let mut state = self.state.lock().await;
        state.closed = true;

        let abandoned = state.waiters.len();
        state.waiters.clear();
        drop(state);

        self.events_ready.notify_waiters();
        tracing::info!(abandoned, "Ledger service stopped");
    }
}

async fn run_finalizer<E: Environment, S: Storage>(
    core: Arc<Core<E, S>>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    #[allow(clippy::disallowed_methods)]
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => core.finalize_pending().await,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            },
        }
    }

    core.close().await;
}
