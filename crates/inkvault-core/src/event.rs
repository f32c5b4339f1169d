//! Notification events.
//!
//! Emitted on record creation only. Updates, deletes and delegate changes
//! are silent on the feed; callers observe them through receipts.

use serde::{Deserialize, Serialize};

use crate::{
    account::Account,
    record::{ContentHash, Record, Timestamp},
};

/// A record came into existence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCreated {
    /// Namespace the record was created in
    pub owner: Account,
    /// Assigned index
    pub index: u64,
    /// Finalization time
    pub timestamp: Timestamp,
    /// Always 1 at creation
    pub version: u64,
    /// Digest of the initial ciphertext
    pub content_hash: ContentHash,
}

impl RecordCreated {
    /// Event describing a freshly created record.
    pub fn for_record(record: &Record) -> Self {
        Self {
            owner: record.owner(),
            index: record.index(),
            timestamp: record.timestamp(),
            version: record.version(),
            content_hash: record.content_hash(),
        }
    }
}

/// A [`RecordCreated`] with its position in the global event log.
///
/// Sequence numbers start at 0 and are gapless.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencedEvent {
    /// Position in the event log
    pub seq: u64,
    /// Event payload
    pub event: RecordCreated,
}

/// Resume position for reading the event log.
///
/// Points at the next event a reader has not yet seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventCursor(pub u64);

impl EventCursor {
    /// Cursor at the start of the log.
    pub const START: Self = Self(0);

    /// Cursor just past `event`.
    pub fn after(event: &SequencedEvent) -> Self {
        Self(event.seq.saturating_add(1))
    }
}
