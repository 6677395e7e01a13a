//! Concurrent hash set.

use parking_lot::RwLock;
use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::hash::Hash;

/// A hash set safe to share between threads.
///
/// Lookups take a shared lock; mutations take an exclusive one.
pub struct Set<T> {
    items: RwLock<HashSet<T>>,
}

impl<T: Eq + Hash> Set<T> {
    /// Create an empty set.
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashSet::new()),
        }
    }

    /// Add an item. Adding an item already present is a no-op.
    pub fn add(&self, item: T) {
        self.items.write().insert(item);
    }

    /// Add every item from `items` under a single lock acquisition.
    pub fn extend<I>(&self, items: I)
    where
        I: IntoIterator<Item = T>,
    {
        self.items.write().extend(items);
    }

    /// Add an item, returning `true` if it was not already present.
    ///
    /// The membership check and the insertion happen under one exclusive
    /// lock, so of several concurrent callers with the same item exactly one
    /// sees `true`.
    pub fn insert(&self, item: T) -> bool {
        self.items.write().insert(item)
    }

    /// Check whether an item is present.
    pub fn has<Q>(&self, item: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.items.read().contains(item)
    }

    /// Remove an item, returning `true` if it was present.
    pub fn delete<Q>(&self, item: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.items.write().remove(item)
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn clear(&self) {
        self.items.write().clear();
    }
}

impl<T: Eq + Hash> Default for Set<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Set<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Set")
            .field("len", &self.items.read().len())
            .finish()
    }
}
