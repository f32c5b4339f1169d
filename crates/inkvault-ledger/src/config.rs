//! Ledger configuration.

use std::time::Duration;

use inkvault_core::AccessPolicy;
use serde::{Deserialize, Serialize};

use crate::store::DEFAULT_MAX_CIPHERTEXT_LEN;

/// Tunables for the ledger and its async service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// How often the background finalizer drains the pending queue
    pub finalize_interval_ms: u64,

    /// How long a submitter waits for its receipt before `Timeout`
    pub finalize_timeout_ms: u64,

    /// Pending transactions accepted before submissions are refused
    pub max_pending: usize,

    /// Largest accepted ciphertext in bytes
    pub max_ciphertext_len: usize,

    /// Events buffered per subscription before the oldest are dropped
    pub feed_capacity: usize,

    /// Finalized receipts kept for lookup by transaction id
    pub receipt_retention: usize,

    /// Read-authorization policy
    pub access: AccessPolicy,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            finalize_interval_ms: 50,
            finalize_timeout_ms: 30_000,
            max_pending: 1024,
            max_ciphertext_len: DEFAULT_MAX_CIPHERTEXT_LEN,
            feed_capacity: 256,
            receipt_retention: 4096,
            access: AccessPolicy::default(),
        }
    }
}

impl LedgerConfig {
    /// Finalizer tick as a [`Duration`].
    pub fn finalize_interval(&self) -> Duration {
        Duration::from_millis(self.finalize_interval_ms.max(1))
    }

    /// Receipt wait bound as a [`Duration`].
    pub fn finalize_timeout(&self) -> Duration {
        Duration::from_millis(self.finalize_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use inkvault_core::DeletedRecordAccess;

    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = LedgerConfig::default();

        assert_eq!(config.max_ciphertext_len, 64 * 1024);
        assert_eq!(config.access.deleted_records, DeletedRecordAccess::RetainDelegates);
        assert!(config.finalize_timeout() > config.finalize_interval());
    }

    #[test]
    fn zero_interval_is_clamped() {
        let config = LedgerConfig { finalize_interval_ms: 0, ..LedgerConfig::default() };
        assert_eq!(config.finalize_interval(), Duration::from_millis(1));
    }
}
