//! Async boundary between the client and a ledger.

use async_trait::async_trait;
use inkvault_core::{Account, Environment, RecordView};
use inkvault_ledger::{Call, LedgerError, LedgerService, Receipt, Storage};

/// The subset of ledger operations the journal client needs.
///
/// [`LedgerService`] implements it directly; tests and simulations can put a
/// fault-injecting or recording wrapper in between.
#[async_trait]
pub trait LedgerApi: Send + Sync {
    /// Submit `call` as `caller` and wait for its receipt.
    async fn execute(&self, caller: Account, call: Call) -> Result<Receipt, LedgerError>;

    /// Read one record as `caller`.
    async fn read(
        &self,
        caller: Account,
        owner: Account,
        index: u64,
    ) -> Result<RecordView, LedgerError>;

    /// Read every record of `owner` as `caller`, in index order.
    async fn read_all(&self, caller: Account, owner: Account)
    -> Result<Vec<RecordView>, LedgerError>;

    /// Number of records `owner` has created, deleted ones included.
    async fn record_count(&self, owner: Account) -> Result<u64, LedgerError>;
}

#[async_trait]
impl<E: Environment, S: Storage> LedgerApi for LedgerService<E, S> {
    async fn execute(&self, caller: Account, call: Call) -> Result<Receipt, LedgerError> {
        LedgerService::execute(self, caller, call).await
    }

    async fn read(
        &self,
        caller: Account,
        owner: Account,
        index: u64,
    ) -> Result<RecordView, LedgerError> {
        LedgerService::read(self, caller, owner, index).await
    }

    async fn read_all(
        &self,
        caller: Account,
        owner: Account,
    ) -> Result<Vec<RecordView>, LedgerError> {
        LedgerService::read_all(self, caller, owner).await
    }

    async fn record_count(&self, owner: Account) -> Result<u64, LedgerError> {
        LedgerService::record_count(self, owner).await
    }
}
