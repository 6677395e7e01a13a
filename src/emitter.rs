//! Emitter tying the registry, dispatcher and deduplicator together.

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::dedup::Deduplicator;
use crate::dispatch::{self, WorkerPool};
use crate::error::{EmitterError, Result};
use crate::subscriptions::{Registry, Subscription};
use crate::types::{Counters, EmitterStats};

/// Default time an idle dispatch thread waits for work before exiting.
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Emitter configuration.
#[derive(Clone, Debug)]
pub struct EmitterConfig {
    /// How long an idle dispatch thread is kept around for reuse.
    /// Default: 5s
    pub idle_timeout: Duration,

    /// Prefix for the names of threads the emitter spawns.
    /// Default: "herald"
    pub thread_name: String,
}

impl EmitterConfig {
    fn validate(&self) -> Result<()> {
        if self.idle_timeout.is_zero() {
            return Err(EmitterError::InvalidConfig(
                "idle_timeout must be non-zero".to_string(),
            ));
        }
        if self.thread_name.is_empty() {
            return Err(EmitterError::InvalidConfig(
                "thread_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for EmitterConfig {
    fn default() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            thread_name: "herald".to_string(),
        }
    }
}

struct Inner<T> {
    registry: Arc<Registry<T>>,
    dedup: Deduplicator<String>,
    pool: WorkerPool,
    counters: Arc<Counters>,
}

/// Thread-safe publish/subscribe emitter for payloads of type `T`.
///
/// Provides:
/// - Registration of handlers, revocable through their [`Subscription`]
/// - Blocking and detached fan-out to a snapshot of live handlers
/// - TTL suppression of bursts sharing a key
///
/// Cloning is cheap and yields another handle to the same emitter. When the
/// last clone is dropped the dispatch queue closes (queued invocations still
/// run), the expiry timer stops, pending suppressions are discarded and any
/// outstanding [`Subscription`] becomes inert.
///
/// A handler that keeps a strong clone of its own emitter forms a reference
/// cycle, and that teardown never happens. Handlers that need to emit should
/// capture a [`WeakEmitter`] from [`downgrade`](Self::downgrade) instead.
pub struct Emitter<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Emitter<T>
where
    T: Send + Sync + 'static,
{
    /// Create an emitter with the default configuration.
    pub fn new() -> Self {
        Self::build(EmitterConfig::default())
    }

    /// Create an emitter with a custom configuration.
    pub fn with_config(config: EmitterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EmitterConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: Arc::new(Registry::new()),
                dedup: Deduplicator::new(&config.thread_name),
                pool: WorkerPool::new(&config.thread_name, config.idle_timeout),
                counters: Arc::new(Counters::default()),
            }),
        }
    }

    /// Register a handler for every subsequent emission.
    ///
    /// The returned handle is only needed to unsubscribe; dropping it keeps
    /// the registration alive.
    pub fn register<F>(&self, handler: F) -> Subscription<T>
    where
        F: Fn(&Subscription<T>, &T) + Send + Sync + 'static,
    {
        self.inner.registry.register(handler)
    }

    /// Deliver `payload` to every live handler and wait until all of them
    /// have returned.
    ///
    /// Handlers run concurrently in no particular order. A handler that never
    /// returns blocks this call forever.
    pub fn emit(&self, payload: T) {
        let inner = &self.inner;
        inner.counters.record_emission();
        dispatch::deliver_blocking(
            &inner.pool,
            inner.registry.snapshot(),
            Arc::new(payload),
            &inner.counters,
        );
    }

    /// Deliver `payload` to every live handler without waiting.
    pub fn emit_async(&self, payload: T) {
        let inner = &self.inner;
        inner.counters.record_emission();
        dispatch::deliver_detached(
            &inner.pool,
            inner.registry.snapshot(),
            Arc::new(payload),
            &inner.counters,
        );
    }

    /// Like [`emit`](Self::emit), unless `key` was emitted within its TTL
    /// window, in which case nothing is delivered.
    ///
    /// An accepted emission suppresses `key` for `ttl`. Suppressed calls do
    /// not extend the window.
    pub fn emit_ttl(&self, payload: T, key: impl Into<String>, ttl: Duration) {
        if self.acquire(key.into(), ttl) {
            self.emit(payload);
        }
    }

    /// Like [`emit_async`](Self::emit_async), with the suppression rules of
    /// [`emit_ttl`](Self::emit_ttl).
    pub fn emit_async_ttl(&self, payload: T, key: impl Into<String>, ttl: Duration) {
        if self.acquire(key.into(), ttl) {
            self.emit_async(payload);
        }
    }

    fn acquire(&self, key: String, ttl: Duration) -> bool {
        let acquired = self.inner.dedup.try_acquire(key, ttl);
        if !acquired {
            self.inner.counters.record_suppressed();
        }
        acquired
    }

    /// Whether emissions with `key` are currently being dropped.
    pub fn is_suppressed(&self, key: &str) -> bool {
        self.inner.dedup.is_suppressed(key)
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Non-owning handle that does not keep the emitter alive.
    pub fn downgrade(&self) -> WeakEmitter<T> {
        WeakEmitter {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Snapshot of this emitter's counters.
    pub fn stats(&self) -> EmitterStats {
        let inner = &self.inner;
        inner
            .counters
            .snapshot(inner.registry.len(), inner.dedup.len())
    }
}

impl<T> Default for Emitter<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Weak reference to an [`Emitter`], for handlers that emit on their own
/// emitter.
pub struct WeakEmitter<T> {
    inner: Weak<Inner<T>>,
}

impl<T> WeakEmitter<T> {
    /// The emitter, if any strong handle to it is still alive.
    pub fn upgrade(&self) -> Option<Emitter<T>> {
        self.inner.upgrade().map(|inner| Emitter { inner })
    }
}

impl<T> Clone for WeakEmitter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for WeakEmitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakEmitter")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl<T> fmt::Debug for Emitter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("subscribers", &self.inner.registry.len())
            .field("dedup", &self.inner.dedup)
            .field("pool", &self.inner.pool)
            .finish()
    }
}
