//! Time-windowed deduplication.
//!
//! A key accepted by [`Deduplicator::try_acquire`] stays suppressed until its
//! TTL elapses. While suppressed, further acquisitions of the same key fail
//! and do not extend the window. Release is driven by the expiry timer only.

mod expiry;

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use crate::collections::Set;

use expiry::Expiry;

/// Set of suppressed keys plus their pending expiries.
pub(crate) struct Deduplicator<K> {
    keys: Arc<Set<K>>,
    expiry: Expiry<K>,
}

impl<K> Deduplicator<K>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
{
    pub fn new(name: &str) -> Self {
        let keys = Arc::new(Set::new());
        let expiry = Expiry::start(name, Arc::clone(&keys));
        Self { keys, expiry }
    }

    /// Suppress `key` for `ttl` unless it is already suppressed.
    ///
    /// Returns `true` when the caller won the key and should deliver. The
    /// check and the mark are one atomic step, so concurrent callers with the
    /// same key cannot both win.
    pub fn try_acquire(&self, key: K, ttl: Duration) -> bool {
        if !self.keys.insert(key.clone()) {
            tracing::trace!(key = ?key, "emission suppressed");
            return false;
        }
        self.expiry.schedule(key, ttl);
        true
    }

    pub fn is_suppressed<Q>(&self, key: &Q) -> bool
    where
        K: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.keys.has(key)
    }

    /// Number of keys inside their window.
    pub fn len(&self) -> usize {
        self.keys.len()
    }
}

impl<K> fmt::Debug for Deduplicator<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deduplicator")
            .field("keys", &self.keys)
            .field("expiry", &self.expiry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_acquire_suppresses_until_expiry() {
        let dedup = Deduplicator::new("dedup-test");
        let ttl = Duration::from_millis(50);

        assert!(dedup.try_acquire("k".to_string(), ttl));
        assert!(!dedup.try_acquire("k".to_string(), ttl));
        assert!(dedup.is_suppressed("k"));

        thread::sleep(Duration::from_millis(150));
        assert!(!dedup.is_suppressed("k"));
        assert!(dedup.try_acquire("k".to_string(), ttl));
    }

    #[test]
    fn test_window_not_extended_by_suppressed_attempts() {
        let dedup = Deduplicator::new("dedup-extend");
        let ttl = Duration::from_millis(100);

        assert!(dedup.try_acquire("k", ttl));
        thread::sleep(Duration::from_millis(60));
        assert!(!dedup.try_acquire("k", ttl));

        // Still measured from the first acquisition, not the second.
        thread::sleep(Duration::from_millis(120));
        assert!(dedup.try_acquire("k", ttl));
    }

    #[test]
    fn test_distinct_keys_independent() {
        let dedup = Deduplicator::new("dedup-keys");
        let ttl = Duration::from_secs(5);

        assert!(dedup.try_acquire("a", ttl));
        assert!(dedup.try_acquire("b", ttl));
        assert_eq!(dedup.len(), 2);
    }

    #[test]
    fn test_concurrent_acquire_single_winner() {
        let dedup = Arc::new(Deduplicator::new("dedup-race"));
        let winners = Arc::new(AtomicUsize::new(0));

        let threads: Vec<_> = (0..32)
            .map(|_| {
                let dedup = Arc::clone(&dedup);
                let winners = Arc::clone(&winners);
                thread::spawn(move || {
                    if dedup.try_acquire("burst", Duration::from_secs(5)) {
                        winners.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();

        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(winners.load(Ordering::SeqCst), 1);
    }
}
