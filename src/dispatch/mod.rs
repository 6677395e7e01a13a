//! Fan-out of one payload to a snapshot of subscriptions.
//!
//! Each handler invocation is a separate job. Blocking delivery waits on a
//! countdown latch sized to exactly the jobs it launched; detached delivery
//! launches and returns.
//!
//! ## Panic handling
//! Invocations run under `catch_unwind`. A panicking handler is logged and
//! counted, the latch still counts down, and the remaining handlers are
//! unaffected. `AssertUnwindSafe` is used, so a handler that panics while
//! holding its own lock can leave that state poisoned or inconsistent.
//!
//! ## Scheduling
//! Jobs never queue behind busy workers: the pool hands each one to a parked
//! thread or starts a new thread for it. Handlers of one emission all run at
//! once, and a blocking emit waits only on the handlers it launched, never on
//! stuck handlers from other emissions. A handler may itself emit on either
//! path.

mod latch;
mod pool;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::subscriptions::Entry;
use crate::types::Counters;

use latch::{CountDownGuard, Latch};
pub(crate) use pool::WorkerPool;

/// Run one handler, isolating any panic.
fn invoke<T>(entry: &Entry<T>, payload: &T, counters: &Counters) {
    match panic::catch_unwind(AssertUnwindSafe(|| entry.call(payload))) {
        Ok(()) => counters.record_delivery(),
        Err(panic_err) => {
            counters.record_panic();
            tracing::warn!(
                subscription = %entry.id(),
                panic = %panic_message(panic_err.as_ref()),
                "subscription handler panicked"
            );
        }
    }
}

fn panic_message(any: &(dyn Any + Send)) -> String {
    if let Some(msg) = any.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = any.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Deliver `payload` to every entry and wait for all invocations to finish.
pub(crate) fn deliver_blocking<T>(
    pool: &WorkerPool,
    entries: Vec<Arc<Entry<T>>>,
    payload: Arc<T>,
    counters: &Arc<Counters>,
) where
    T: Send + Sync + 'static,
{
    if entries.is_empty() {
        return;
    }

    let latch = Arc::new(Latch::new(entries.len()));
    for entry in entries {
        let latch = Arc::clone(&latch);
        let payload = Arc::clone(&payload);
        let counters = Arc::clone(counters);
        pool.execute(Box::new(move || {
            let _guard = CountDownGuard(&latch);
            invoke(&entry, &payload, &counters);
        }));
    }
    latch.wait();
}

/// Deliver `payload` to every entry without waiting.
pub(crate) fn deliver_detached<T>(
    pool: &WorkerPool,
    entries: Vec<Arc<Entry<T>>>,
    payload: Arc<T>,
    counters: &Arc<Counters>,
) where
    T: Send + Sync + 'static,
{
    for entry in entries {
        let payload = Arc::clone(&payload);
        let counters = Arc::clone(counters);
        pool.execute(Box::new(move || invoke(&entry, &payload, &counters)));
    }
}
