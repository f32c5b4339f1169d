//! Standard invariant checks.

use inkvault_core::ContentHash;

use super::{Invariant, InvariantResult, LedgerSnapshot, Violation};

fn violation(invariant: &'static str, message: String) -> InvariantResult {
    Err(Violation { invariant, message })
}

/// Each owner's records carry indices exactly `0..n`, in order.
pub struct ContiguousIndices;

impl Invariant for ContiguousIndices {
    fn name(&self) -> &'static str {
        "contiguous_indices"
    }

    fn check(&self, state: &LedgerSnapshot) -> InvariantResult {
        for (owner, records) in &state.records {
            for (position, record) in records.iter().enumerate() {
                if record.owner() != *owner || record.index() != position as u64 {
                    return violation(
                        self.name(),
                        format!(
                            "owner {owner} slot {position} holds {}#{}",
                            record.owner(),
                            record.index()
                        ),
                    );
                }
            }
        }
        Ok(())
    }
}

/// The stored content hash is the SHA-256 of the stored ciphertext.
pub struct ContentHashMatches;

impl Invariant for ContentHashMatches {
    fn name(&self) -> &'static str {
        "content_hash_matches"
    }

    fn check(&self, state: &LedgerSnapshot) -> InvariantResult {
        for record in state.all_records() {
            if record.content_hash() != ContentHash::of(record.ciphertext()) {
                return violation(
                    self.name(),
                    format!(
                        "{}#{}: stale hash {}",
                        record.owner(),
                        record.index(),
                        record.content_hash()
                    ),
                );
            }
            if record.ciphertext().is_empty() || record.version() == 0 {
                return violation(
                    self.name(),
                    format!("{}#{}: empty ciphertext or version 0", record.owner(), record.index()),
                );
            }
        }
        Ok(())
    }
}

/// The creation log has one gapless entry per record, describing it at
/// version 1.
pub struct EventLogComplete;

impl Invariant for EventLogComplete {
    fn name(&self) -> &'static str {
        "event_log_complete"
    }

    fn check(&self, state: &LedgerSnapshot) -> InvariantResult {
        if state.events.len() != state.record_total() {
            return violation(
                self.name(),
                format!("{} events for {} records", state.events.len(), state.record_total()),
            );
        }

        for (position, sequenced) in state.events.iter().enumerate() {
            let event = &sequenced.event;
            if sequenced.seq != position as u64 {
                let message = format!("event {position} has seq {}", sequenced.seq);
                return violation(self.name(), message);
            }
            if event.version != 1 || state.record(&event.owner, event.index).is_none() {
                return violation(
                    self.name(),
                    format!("event {position} describes missing {}#{}", event.owner, event.index),
                );
            }
        }
        Ok(())
    }
}

/// Granting to the owner never enters the delegate set.
pub struct OwnerNeverDelegate;

impl Invariant for OwnerNeverDelegate {
    fn name(&self) -> &'static str {
        "owner_never_delegate"
    }

    fn check(&self, state: &LedgerSnapshot) -> InvariantResult {
        for record in state.all_records() {
            if record.delegates().contains(&record.owner()) {
                return violation(
                    self.name(),
                    format!("{}#{} lists its owner as delegate", record.owner(), record.index()),
                );
            }
        }
        Ok(())
    }
}

/// Records are never removed and their versions never decrease.
pub struct VersionMonotonicity;

impl Invariant for VersionMonotonicity {
    fn name(&self) -> &'static str {
        "version_monotonicity"
    }

    fn check(&self, _state: &LedgerSnapshot) -> InvariantResult {
        Ok(())
    }

    fn check_transition(&self, before: &LedgerSnapshot, after: &LedgerSnapshot) -> InvariantResult {
        for old in before.all_records() {
            let Some(new) = after.record(&old.owner(), old.index()) else {
                let message = format!("{}#{} disappeared", old.owner(), old.index());
                return violation(self.name(), message);
            };
            if new.version() < old.version() {
                return violation(
                    self.name(),
                    format!(
                        "{}#{} version went {} -> {}",
                        old.owner(),
                        old.index(),
                        old.version(),
                        new.version()
                    ),
                );
            }
            if old.is_deleted() && !new.is_deleted() {
                let message = format!("{}#{} was undeleted", old.owner(), old.index());
                return violation(self.name(), message);
            }
        }

        if after.ledger_height < before.ledger_height {
            return violation(
                self.name(),
                format!(
                    "ledger height went {:?} -> {:?}",
                    before.ledger_height, after.ledger_height
                ),
            );
        }
        Ok(())
    }
}

/// A deleted record's content, version and timestamp never change.
///
/// Its delegate set may still shrink through revocation.
pub struct DeletedRecordsFrozen;

impl Invariant for DeletedRecordsFrozen {
    fn name(&self) -> &'static str {
        "deleted_records_frozen"
    }

    fn check(&self, _state: &LedgerSnapshot) -> InvariantResult {
        Ok(())
    }

    fn check_transition(&self, before: &LedgerSnapshot, after: &LedgerSnapshot) -> InvariantResult {
        for old in before.all_records().filter(|r| r.is_deleted()) {
            let Some(new) = after.record(&old.owner(), old.index()) else {
                continue;
            };
            let frozen = new.ciphertext() == old.ciphertext()
                && new.version() == old.version()
                && new.timestamp() == old.timestamp();
            let narrowed = new.delegates().iter().all(|d| old.delegates().contains(d));

            if !frozen || !narrowed {
                return violation(
                    self.name(),
                    format!("deleted {}#{} changed", old.owner(), old.index()),
                );
            }
        }
        Ok(())
    }
}
