//! Wait-group primitive for dynamic fan-out termination
//!
//! The tree walker and the hash stages both spawn an unknown number of jobs
//! on the scheduler and must block until every one of them has finished.
//! `WaitGroup` is the counter they share: `add` before scheduling, `done`
//! inside the job, `wait` to block until the count drains to zero.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// Counter that tracks outstanding work across threads
///
/// Clones share the same counter. `wait` returns once the count reaches
/// zero; a fresh group (count zero) does not block.
#[derive(Clone)]
pub struct WaitGroup {
    inner: Arc<Inner>,
}

struct Inner {
    count: Mutex<usize>,
    drained: Condvar,
}

impl WaitGroup {
    /// Create a new wait group with a count of zero
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                count: Mutex::new(0),
                drained: Condvar::new(),
            }),
        }
    }

    /// Increment the outstanding-work count by `n`
    pub fn add(&self, n: usize) {
        let mut count = self.inner.count.lock();
        *count += n;
    }

    /// Mark one unit of work as finished
    ///
    /// Panics if called more times than `add` accounted for.
    pub fn done(&self) {
        let mut count = self.inner.count.lock();
        *count = count
            .checked_sub(1)
            .expect("WaitGroup::done called without matching add");
        if *count == 0 {
            self.inner.drained.notify_all();
        }
    }

    /// Block until the count reaches zero
    pub fn wait(&self) {
        let mut count = self.inner.count.lock();
        while *count > 0 {
            self.inner.drained.wait(&mut count);
        }
    }

    /// Current outstanding count (racy, for diagnostics only)
    pub fn pending(&self) -> usize {
        *self.inner.count.lock()
    }
}

impl Default for WaitGroup {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_empty_group_does_not_block() {
        let wg = WaitGroup::new();
        wg.wait();
    }

    #[test]
    fn test_wait_blocks_until_done() {
        let wg = WaitGroup::new();
        wg.add(3);

        let worker_wg = wg.clone();
        let handle = thread::spawn(move || {
            for _ in 0..3 {
                thread::sleep(Duration::from_millis(5));
                worker_wg.done();
            }
        });

        wg.wait();
        assert_eq!(wg.pending(), 0);
        handle.join().unwrap();
    }

    #[test]
    fn test_add_from_many_threads() {
        let wg = WaitGroup::new();
        let mut handles = Vec::new();

        for _ in 0..8 {
            let wg = wg.clone();
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    wg.add(1);
                    wg.done();
                }
            }));
        }

        for h in handles {
            h.join().unwrap();
        }
        wg.wait();
    }

    #[test]
    #[should_panic(expected = "without matching add")]
    fn test_unmatched_done_panics() {
        let wg = WaitGroup::new();
        wg.done();
    }
}
