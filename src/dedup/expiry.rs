//! Timer thread releasing suppressed keys once their TTL elapses.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{self, AtomicU64};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::collections::Set;

/// One pending removal.
struct Deadline<K> {
    at: Instant,
    /// Tie-breaker so equal instants pop in scheduling order.
    seq: u64,
    key: K,
}

impl<K> PartialEq for Deadline<K> {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl<K> Eq for Deadline<K> {}

impl<K> PartialOrd for Deadline<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for Deadline<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.at.cmp(&other.at).then(self.seq.cmp(&other.seq))
    }
}

/// Schedules one deferred removal per accepted key.
///
/// A single thread owns a min-heap of deadlines and deletes each key from
/// the shared set when its deadline passes. Dropping the `Expiry` stops the
/// thread; removals still pending at that point never run.
pub(crate) struct Expiry<K> {
    sender: Option<Sender<Deadline<K>>>,
    keys: Arc<Set<K>>,
    next_seq: AtomicU64,
}

impl<K> Expiry<K>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
{
    pub fn start(name: &str, keys: Arc<Set<K>>) -> Self {
        let (sender, receiver) = unbounded();
        let timer_keys = Arc::clone(&keys);

        let spawned = thread::Builder::new()
            .name(format!("{name}-expiry"))
            .spawn(move || Self::run(receiver, timer_keys));

        let sender = match spawned {
            Ok(_) => Some(sender),
            Err(error) => {
                tracing::error!(%error, "failed to spawn expiry timer, TTL suppression disabled");
                None
            }
        };

        Self {
            sender,
            keys,
            next_seq: AtomicU64::new(0),
        }
    }

    /// Remove `key` from the set once `ttl` has elapsed.
    ///
    /// Without a running timer the key is released immediately, so a missing
    /// timer can only weaken suppression, never block delivery for good.
    ///
    /// A `ttl` too large to represent as an `Instant` never expires: the key
    /// stays suppressed until the emitter is dropped.
    pub fn schedule(&self, key: K, ttl: Duration) {
        let Some(at) = Instant::now().checked_add(ttl) else {
            tracing::debug!(key = ?key, ?ttl, "ttl beyond clock range, key held until teardown");
            return;
        };
        let deadline = Deadline {
            at,
            seq: self.next_seq.fetch_add(1, atomic::Ordering::Relaxed),
            key,
        };

        let undelivered = match &self.sender {
            Some(sender) => sender.send(deadline).err().map(|err| err.into_inner()),
            None => Some(deadline),
        };
        if let Some(deadline) = undelivered {
            self.keys.delete(&deadline.key);
        }
    }

    fn run(receiver: Receiver<Deadline<K>>, keys: Arc<Set<K>>) {
        let mut pending: BinaryHeap<Reverse<Deadline<K>>> = BinaryHeap::new();

        loop {
            let next = match pending.peek() {
                Some(Reverse(top)) => {
                    receiver.recv_timeout(top.at.saturating_duration_since(Instant::now()))
                }
                None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };

            match next {
                Ok(deadline) => pending.push(Reverse(deadline)),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            let now = Instant::now();
            while pending.peek().is_some_and(|Reverse(top)| top.at <= now) {
                if let Some(Reverse(expired)) = pending.pop() {
                    keys.delete(&expired.key);
                    tracing::trace!(key = ?expired.key, "suppression expired");
                }
            }
        }

        tracing::trace!(discarded = pending.len(), "expiry timer exiting");
    }
}

impl<K> fmt::Debug for Expiry<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expiry")
            .field("running", &self.sender.is_some())
            .finish()
    }
}
