//! Registry of live subscriptions for one emitter.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::types::SubscriptionId;

use super::types::{Entry, Subscription};

/// Ordered list of live subscriptions behind a single read/write lock.
///
/// Emissions take the read lock just long enough to clone the list of
/// entries; `register` and `remove` take the write lock.
pub(crate) struct Registry<T> {
    entries: RwLock<Vec<Arc<Entry<T>>>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Append a handler and return its handle.
    pub fn register<F>(self: &Arc<Self>, handler: F) -> Subscription<T>
    where
        F: Fn(&Subscription<T>, &T) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let handle = Subscription {
            id,
            registry: Arc::downgrade(self),
        };
        let entry = Arc::new(Entry {
            handle: handle.clone(),
            handler: Box::new(handler),
        });

        let count = {
            let mut entries = self.entries.write();
            entries.push(entry);
            entries.len()
        };
        tracing::debug!(subscription = %id, subscribers = count, "registered subscription");

        handle
    }

    /// Remove the subscription with `id`. Returns `false` if it was not live.
    ///
    /// Removing the sole remaining entry clears the list; otherwise a new
    /// list is built from the survivors in their original order.
    pub fn remove(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.write();

        if entries.len() == 1 && entries[0].id() == id {
            entries.clear();
            tracing::debug!(subscription = %id, subscribers = 0, "removed subscription");
            return true;
        }

        if !entries.iter().any(|entry| entry.id() == id) {
            tracing::trace!(subscription = %id, "close on inactive subscription ignored");
            return false;
        }

        let survivors: Vec<_> = entries
            .iter()
            .filter(|entry| entry.id() != id)
            .cloned()
            .collect();
        *entries = survivors;
        tracing::debug!(subscription = %id, subscribers = entries.len(), "removed subscription");
        true
    }

    /// Capture the entries live right now.
    pub fn snapshot(&self) -> Vec<Arc<Entry<T>>> {
        self.entries.read().clone()
    }

    pub fn contains(&self, id: SubscriptionId) -> bool {
        self.entries.read().iter().any(|entry| entry.id() == id)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }
}
