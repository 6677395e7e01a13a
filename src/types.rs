//! Core types shared by the registry, dispatcher and emitter.

use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Stable identity of a subscription within one emitter.
///
/// Ids are handed out from a monotonically increasing counter and never
/// reused, so removal never depends on where an entry sits in the list.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SubscriptionId(pub u64);

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Point-in-time view of an emitter's counters.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EmitterStats {
    /// Emissions that reached fan-out (suppressed ones excluded).
    pub emissions: u64,
    /// TTL emissions dropped because their key was still suppressed.
    pub suppressed: u64,
    /// Handler invocations that ran to completion.
    pub deliveries: u64,
    /// Handler invocations that panicked.
    pub panics: u64,
    /// Live subscriptions at snapshot time.
    pub subscribers: usize,
    /// Keys currently inside their TTL window.
    pub suppressed_keys: usize,
}

/// Live counters behind [`EmitterStats`].
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub emissions: AtomicU64,
    pub suppressed: AtomicU64,
    pub deliveries: AtomicU64,
    pub panics: AtomicU64,
}

impl Counters {
    pub fn record_emission(&self) {
        self.emissions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_suppressed(&self) {
        self.suppressed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delivery(&self) {
        self.deliveries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_panic(&self) {
        self.panics.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, subscribers: usize, suppressed_keys: usize) -> EmitterStats {
        EmitterStats {
            emissions: self.emissions.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            panics: self.panics.load(Ordering::Relaxed),
            subscribers,
            suppressed_keys,
        }
    }
}
