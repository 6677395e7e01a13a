//! Elastic worker pool.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// A unit of work executed on a pool thread.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Bookkeeping shared between the pool and its workers.
#[derive(Debug, Default)]
struct Shared {
    /// Workers parked on the queue that no submitter has claimed yet.
    idle: AtomicUsize,
    /// Workers currently alive.
    live: AtomicUsize,
    /// Suffix for the next worker's thread name.
    next_index: AtomicUsize,
}

impl Shared {
    /// Take one idle slot. A successful claim obliges the caller to queue
    /// exactly one job.
    fn claim_idle(&self) -> bool {
        self.idle
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |idle| idle.checked_sub(1))
            .is_ok()
    }
}

/// Pool that never makes a job wait for a busy worker.
///
/// A submitted job goes to an idle worker when one is parked, otherwise a new
/// thread is started for it. Every job therefore starts immediately, no
/// matter how many earlier jobs are still running. Workers that stay idle
/// for `idle_timeout` exit.
///
/// Dropping the pool closes the queue: jobs already queued still run, then
/// the workers exit on their own. Workers are not joined.
pub(crate) struct WorkerPool {
    sender: Sender<Job>,
    receiver: Receiver<Job>,
    shared: Arc<Shared>,
    name: String,
    idle_timeout: Duration,
}

impl WorkerPool {
    /// Create a pool whose threads are named `{name}-{index}`. No thread is
    /// started until the first job arrives.
    pub fn new(name: &str, idle_timeout: Duration) -> Self {
        let (sender, receiver) = unbounded::<Job>();
        Self {
            sender,
            receiver,
            shared: Arc::new(Shared::default()),
            name: name.to_string(),
            idle_timeout,
        }
    }

    /// Start `job` now, on a parked worker or on a fresh thread.
    ///
    /// If no thread can be spawned the job runs inline on the caller.
    pub fn execute(&self, job: Job) {
        if self.shared.claim_idle() {
            // The claimed worker holds a receiver until it takes a job, so the
            // queue cannot be disconnected here.
            if let Err(returned) = self.sender.send(job) {
                (returned.into_inner())();
            }
            return;
        }
        self.spawn_worker(job);
    }

    fn spawn_worker(&self, first: Job) {
        let index = self.shared.next_index.fetch_add(1, Ordering::Relaxed);
        let receiver = self.receiver.clone();
        let shared = Arc::clone(&self.shared);
        let idle_timeout = self.idle_timeout;

        // The job is handed back through this slot if the spawn fails.
        let slot = Arc::new(Mutex::new(Some(first)));
        let worker_slot = Arc::clone(&slot);

        self.shared.live.fetch_add(1, Ordering::AcqRel);
        let spawned = thread::Builder::new()
            .name(format!("{}-{index}", self.name))
            .spawn(move || {
                let first = worker_slot.lock().take();
                Self::run(first, receiver, shared, idle_timeout);
            });

        if let Err(error) = spawned {
            self.shared.live.fetch_sub(1, Ordering::AcqRel);
            tracing::warn!(%error, "failed to spawn dispatch worker, running job inline");
            if let Some(job) = slot.lock().take() {
                job();
            }
        }
    }

    fn run(
        first: Option<Job>,
        receiver: Receiver<Job>,
        shared: Arc<Shared>,
        idle_timeout: Duration,
    ) {
        if let Some(job) = first {
            job();
        }

        loop {
            shared.idle.fetch_add(1, Ordering::AcqRel);
            match receiver.recv_timeout(idle_timeout) {
                Ok(job) => job(),
                Err(RecvTimeoutError::Timeout) => {
                    if shared.claim_idle() {
                        break;
                    }
                    // Our slot was claimed just now; its job is on the way.
                    match receiver.recv() {
                        Ok(job) => job(),
                        Err(_) => break,
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        shared.live.fetch_sub(1, Ordering::AcqRel);
        tracing::trace!("dispatch worker exiting");
    }

    /// Workers currently alive.
    pub fn live_workers(&self) -> usize {
        self.shared.live.load(Ordering::Acquire)
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("live", &self.shared.live.load(Ordering::Relaxed))
            .field("idle", &self.shared.idle.load(Ordering::Relaxed))
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}
