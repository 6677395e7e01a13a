//! Countdown latch.

use parking_lot::{Condvar, Mutex};

/// Blocks waiters until `count_down` has been called `count` times.
pub(crate) struct Latch {
    remaining: Mutex<usize>,
    released: Condvar,
}

impl Latch {
    pub fn new(count: usize) -> Self {
        Self {
            remaining: Mutex::new(count),
            released: Condvar::new(),
        }
    }

    pub fn count_down(&self) {
        let mut remaining = self.remaining.lock();
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            self.released.notify_all();
        }
    }

    /// Block until the count reaches zero. Returns immediately for a latch
    /// created with zero.
    pub fn wait(&self) {
        let mut remaining = self.remaining.lock();
        while *remaining > 0 {
            self.released.wait(&mut remaining);
        }
    }
}

/// Counts a latch down when dropped, including during unwinding.
pub(crate) struct CountDownGuard<'a>(pub &'a Latch);

impl Drop for CountDownGuard<'_> {
    fn drop(&mut self) {
        self.0.count_down();
    }
}
