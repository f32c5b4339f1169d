//! Creation notification feed.
//!
//! Two ways to follow record creation without polling every owner:
//!
//! - **Push**: [`NotificationFeed::subscribe`] registers a bounded queue the
//!   ledger fills as it finalizes creates; [`NotificationFeed::drain`] empties
//!   it. A subscriber that falls behind loses the oldest events and is told
//!   how many through [`Delivery::lagged`].
//! - **Cursor**: [`NotificationFeed::events_since`] reads the durable event
//!   log from any position, which is also how a lagged subscriber catches up.

use std::collections::{BTreeMap, VecDeque};

use inkvault_core::{Account, EventCursor, SequencedEvent};

use crate::storage::{Storage, StorageError};

/// Handle for one push subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

/// Which creation events a subscriber receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    /// Every creation
    All,
    /// Creations in one owner's namespace
    Owner(Account),
}

impl EventFilter {
    fn matches(&self, event: &SequencedEvent) -> bool {
        match self {
            Self::All => true,
            Self::Owner(owner) => event.event.owner == *owner,
        }
    }
}

/// Events taken from a subscription queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Queued events, oldest first
    pub events: Vec<SequencedEvent>,
    /// Matching events dropped since the previous drain
    pub lagged: u64,
}

struct Subscription {
    filter: EventFilter,
    queue: VecDeque<SequencedEvent>,
    lagged: u64,
}

/// Subscription registry plus a view of the durable event log.
pub struct NotificationFeed<S: Storage> {
    storage: S,
    subscriptions: BTreeMap<SubscriptionId, Subscription>,
    next_id: u64,
    capacity: usize,
}

impl<S: Storage> NotificationFeed<S> {
    /// Feed over `storage` with `capacity` events buffered per subscription.
    pub fn new(storage: S, capacity: usize) -> Self {
        Self { storage, subscriptions: BTreeMap::new(), next_id: 0, capacity: capacity.max(1) }
    }

    /// Start receiving events that match `filter`.
    ///
    /// Only events finalized after this call are queued.
    pub fn subscribe(&mut self, filter: EventFilter) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;

        self.subscriptions
            .insert(id, Subscription { filter, queue: VecDeque::new(), lagged: 0 });

        tracing::debug!(subscription = id.0, ?filter, "Subscribed to feed");
        id
    }

    /// Stop a subscription. Returns `false` if it did not exist.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(&id).is_some()
    }

    /// Take everything queued for `id`. `None` if unknown.
    pub fn drain(&mut self, id: SubscriptionId) -> Option<Delivery> {
        let subscription = self.subscriptions.get_mut(&id)?;

        Some(Delivery {
            events: subscription.queue.drain(..).collect(),
            lagged: std::mem::take(&mut subscription.lagged),
        })
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    /// Read up to `limit` events matching `filter` from `cursor` onward.
    ///
    /// Returns the events and the cursor to resume from. The cursor advances
    /// past every event scanned, matching or not.
    pub fn events_since(
        &self,
        cursor: EventCursor,
        filter: EventFilter,
        limit: usize,
    ) -> Result<(Vec<SequencedEvent>, EventCursor), StorageError> {
        const PAGE: usize = 256;

        let mut events = Vec::new();
        let mut next = cursor;

        while events.len() < limit {
            let page = self.storage.load_events(next.0, PAGE)?;
            let Some(last) = page.last() else {
                break;
            };
            let page_end = EventCursor::after(last);

            for event in page {
                if events.len() >= limit {
                    return Ok((events, next));
                }
                next = EventCursor::after(&event);
                if filter.matches(&event) {
                    events.push(event);
                }
            }

            debug_assert_eq!(next, page_end);
        }

        Ok((events, next))
    }

    /// Queue `event` on every matching subscription.
    pub(crate) fn publish(&mut self, event: &SequencedEvent) {
        for (id, subscription) in &mut self.subscriptions {
            if !subscription.filter.matches(event) {
                continue;
            }

            if subscription.queue.len() >= self.capacity {
                subscription.queue.pop_front();
                subscription.lagged += 1;
                tracing::warn!(subscription = id.0, seq = event.seq, "Subscriber lagging");
            }

            subscription.queue.push_back(event.clone());
        }
    }
}
