//! Execution context threaded through every store call.

use crate::{account::Account, record::Timestamp};

/// Authenticated caller identity and finalization time for one operation.
///
/// Built by the hosting ledger, never by the store itself. The store trusts
/// `caller` for authorization; `owner` and delegate accounts that appear as
/// operation arguments are only the subject of the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    caller: Account,
    timestamp: Timestamp,
}

impl CallContext {
    /// Context for `caller` at the given finalization time.
    pub fn new(caller: Account, timestamp: Timestamp) -> Self {
        Self { caller, timestamp }
    }

    /// Account executing the operation.
    pub fn caller(&self) -> Account {
        self.caller
    }

    /// Finalization time stamped onto any write.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}
