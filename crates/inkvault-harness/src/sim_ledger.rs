//! In-process ledger for deterministic client tests.
//!
//! Wraps a synchronous [`Ledger`] over [`MemoryStorage`] and a [`SimEnv`].
//! `execute` finalizes synchronously, so there is no background task and no
//! real time involved. Transactions queued with [`SimLedger::submit`] are
//! finalized ahead of the next `execute`, in submission order, which lets a
//! test stage a race.

#![allow(clippy::disallowed_types, reason = "synchronous simulation state behind std Mutex")]

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use inkvault_client::LedgerApi;
use inkvault_core::{Account, RecordView};
use inkvault_ledger::{
    Call, Ledger, LedgerConfig, LedgerError, MemoryStorage, Receipt, StorageError, TxId,
};

use crate::{invariants::LedgerSnapshot, sim_env::SimEnv};

/// Shared handle to a simulated ledger.
#[derive(Clone)]
pub struct SimLedger {
    ledger: Arc<Mutex<Ledger<SimEnv, MemoryStorage>>>,
    env: SimEnv,
    storage: MemoryStorage,
}

impl SimLedger {
    /// Fresh ledger with its environment seeded by `seed`.
    pub fn new(seed: u64, config: &LedgerConfig) -> Result<Self, LedgerError> {
        let env = SimEnv::with_seed(seed);
        let storage = MemoryStorage::new();
        let ledger = Ledger::open(env.clone(), storage.clone(), config)?;

        Ok(Self { ledger: Arc::new(Mutex::new(ledger)), env, storage })
    }

    /// Simulation environment driving this ledger.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Backing storage.
    pub fn storage(&self) -> &MemoryStorage {
        &self.storage
    }

    /// Snapshot of persisted state.
    pub fn snapshot(&self) -> Result<LedgerSnapshot, StorageError> {
        LedgerSnapshot::capture(&self.storage)
    }

    /// Queue a transaction without finalizing it.
    pub fn submit(&self, caller: Account, call: Call) -> Result<TxId, LedgerError> {
        self.lock().submit(caller, call)
    }

    /// Finalize everything queued, returning receipts in order.
    pub fn finalize_all(&self) -> Result<Vec<Receipt>, LedgerError> {
        let (receipts, error) = self.lock().finalize_all();
        match error {
            Some(e) => Err(e),
            None => Ok(receipts),
        }
    }

    /// Receipt of a finalized transaction.
    pub fn receipt(&self, tx_id: TxId) -> Option<Receipt> {
        self.lock().receipt(tx_id).cloned()
    }

    #[allow(clippy::expect_used)]
    fn lock(&self) -> MutexGuard<'_, Ledger<SimEnv, MemoryStorage>> {
        self.ledger.lock().expect("Mutex poisoned")
    }
}

#[async_trait]
impl LedgerApi for SimLedger {
    async fn execute(&self, caller: Account, call: Call) -> Result<Receipt, LedgerError> {
        let mut ledger = self.lock();
        let tx_id = ledger.submit(caller, call)?;

        let (receipts, error) = ledger.finalize_all();
        if let Some(receipt) = receipts.into_iter().find(|r| r.tx_id == tx_id) {
            return Ok(receipt);
        }

        tracing::warn!(tx = %tx_id, "transaction left pending");
        Err(error.unwrap_or(LedgerError::Timeout { tx_id }))
    }

    async fn read(
        &self,
        caller: Account,
        owner: Account,
        index: u64,
    ) -> Result<RecordView, LedgerError> {
        Ok(self.lock().read(caller, owner, index)?)
    }

    async fn read_all(
        &self,
        caller: Account,
        owner: Account,
    ) -> Result<Vec<RecordView>, LedgerError> {
        Ok(self.lock().read_all(caller, owner)?)
    }

    async fn record_count(&self, owner: Account) -> Result<u64, LedgerError> {
        Ok(self.lock().record_count(owner)?)
    }
}
