//! Min-heap of workers ordered by queue depth
//!
//! The pool is the dispatcher's view of the workers: a binary min-heap
//! keyed on each worker's pending depth, so `pop` always yields the
//! least-loaded worker. Every worker carries its current heap position
//! (updated on each swap), which makes `remove` O(log n) with no search.
//!
//! The pool is owned and mutated exclusively by the scheduler's dispatch
//! loop; it needs no locking of its own.

use crate::balancer::worker::{WorkerHandle, NOT_IN_HEAP};
use std::fmt;

pub(crate) struct Pool {
    /// Worker handles indexed by worker id; membership is fixed for the
    /// scheduler's lifetime.
    slots: Vec<WorkerHandle>,

    /// Worker ids arranged as a binary min-heap on pending depth.
    heap: Vec<usize>,
}

impl Pool {
    /// Build a pool containing every handle, all at depth zero
    pub(crate) fn new(slots: Vec<WorkerHandle>) -> Self {
        let ids: Vec<usize> = (0..slots.len()).collect();
        let mut pool = Self {
            slots,
            heap: Vec::with_capacity(ids.len()),
        };
        for id in ids {
            pool.push(id);
        }
        pool
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn handle(&self, id: usize) -> &WorkerHandle {
        &self.slots[id]
    }

    pub(crate) fn handle_mut(&mut self, id: usize) -> &mut WorkerHandle {
        &mut self.slots[id]
    }

    /// Remove and return the id of a worker with minimum depth
    pub(crate) fn pop(&mut self) -> Option<usize> {
        if self.heap.is_empty() {
            return None;
        }
        Some(self.remove_at(0))
    }

    /// Insert a worker id, restoring the heap property
    pub(crate) fn push(&mut self, id: usize) {
        debug_assert_eq!(self.slots[id].heap_pos, NOT_IN_HEAP);
        let pos = self.heap.len();
        self.heap.push(id);
        self.slots[id].heap_pos = pos;
        self.sift_up(pos);
    }

    /// Remove a specific worker from wherever it sits in the heap
    pub(crate) fn remove(&mut self, id: usize) {
        let pos = self.slots[id].heap_pos;
        debug_assert_ne!(pos, NOT_IN_HEAP);
        self.remove_at(pos);
    }

    /// Depth snapshot across all workers, indexed by worker id
    pub(crate) fn depths(&self) -> Vec<usize> {
        self.slots.iter().map(|s| s.queue_size()).collect()
    }

    fn remove_at(&mut self, pos: usize) -> usize {
        let last = self.heap.len() - 1;
        if pos != last {
            self.swap(pos, last);
        }
        let id = self.heap.pop().expect("remove_at on empty heap");
        self.slots[id].heap_pos = NOT_IN_HEAP;
        if pos < self.heap.len() {
            self.sift_down(pos);
            self.sift_up(pos);
        }
        id
    }

    fn depth_at(&self, pos: usize) -> usize {
        self.slots[self.heap[pos]].queue_size()
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.slots[self.heap[a]].heap_pos = a;
        self.slots[self.heap[b]].heap_pos = b;
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.depth_at(pos) >= self.depth_at(parent) {
                break;
            }
            self.swap(pos, parent);
            pos = parent;
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        loop {
            let left = 2 * pos + 1;
            if left >= self.heap.len() {
                break;
            }
            let right = left + 1;
            let mut least = left;
            if right < self.heap.len() && self.depth_at(right) < self.depth_at(left) {
                least = right;
            }
            if self.depth_at(pos) <= self.depth_at(least) {
                break;
            }
            self.swap(pos, least);
            pos = least;
        }
    }

    #[cfg(test)]
    fn assert_invariants(&self) {
        for pos in 0..self.heap.len() {
            let id = self.heap[pos];
            assert_eq!(self.slots[id].heap_pos, pos, "stale back-reference");
            for child in [2 * pos + 1, 2 * pos + 2] {
                if child < self.heap.len() {
                    assert!(
                        self.depth_at(pos) <= self.depth_at(child),
                        "heap property violated at {pos}"
                    );
                }
            }
        }
        let mut seen: Vec<usize> = self.heap.clone();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), self.heap.len(), "duplicate worker in heap");
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let depths = self.depths();
        let stats = LoadStats::from_depths(&depths);
        write!(f, "pool: {:?}, load: {}", depths, stats)
    }
}

/// Load distribution across the pool, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadStats {
    pub avg: f64,
    pub median: f64,
    pub stddev: f64,
}

impl LoadStats {
    /// Compute load statistics from a depth snapshot
    pub fn from_depths(depths: &[usize]) -> Self {
        if depths.is_empty() {
            return Self {
                avg: 0.0,
                median: 0.0,
                stddev: 0.0,
            };
        }

        let count = depths.len() as f64;
        let avg = depths.iter().map(|&d| d as f64).sum::<f64>() / count;

        let mut sorted: Vec<usize> = depths.to_vec();
        sorted.sort_unstable();
        let median = sorted[sorted.len() / 2] as f64;

        let stddev = if depths.len() < 2 {
            0.0
        } else {
            let var = depths
                .iter()
                .map(|&d| (d as f64 - median).powi(2))
                .sum::<f64>()
                / (count - 1.0);
            var.sqrt()
        };

        Self {
            avg,
            median,
            stddev,
        }
    }
}

impl fmt::Display for LoadStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{avg: {:.1}, median: {:.1}, stddev: {:.1}}}",
            self.avg, self.median, self.stddev
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balancer::worker::worker_pair;
    use crossbeam_channel::unbounded;

    fn make_pool(n: usize) -> Pool {
        let (done_tx, _done_rx) = unbounded();
        let slots = (0..n)
            .map(|id| {
                let (worker, handle) = worker_pair(id, done_tx.clone());
                drop(worker); // heap tests never execute jobs
                handle
            })
            .collect();
        Pool::new(slots)
    }

    #[test]
    fn test_pop_returns_min_depth() {
        let mut pool = make_pool(4);
        pool.handle_mut(0).pending = 5;
        pool.handle_mut(1).pending = 2;
        pool.handle_mut(2).pending = 8;
        pool.handle_mut(3).pending = 3;

        // Depths changed underneath; rebuild ordering the way the
        // dispatcher does, by remove + push.
        for id in 0..4 {
            pool.remove(id);
            pool.push(id);
        }
        pool.assert_invariants();

        assert_eq!(pool.pop(), Some(1));
        assert_eq!(pool.pop(), Some(3));
        assert_eq!(pool.pop(), Some(0));
        assert_eq!(pool.pop(), Some(2));
        assert_eq!(pool.pop(), None);
    }

    #[test]
    fn test_heap_property_under_churn() {
        let mut pool = make_pool(9);

        // Deterministic pseudo-random depth churn.
        let mut seed = 0x2545f4914f6cdd1du64;
        for round in 0..200 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(round);
            let id = (seed >> 33) as usize % 9;
            let depth = (seed >> 7) as usize % 16;

            pool.remove(id);
            pool.handle_mut(id).pending = depth;
            pool.push(id);
            pool.assert_invariants();
        }

        // Drain: must come out in nondecreasing depth order.
        let mut prev = 0;
        while let Some(id) = pool.pop() {
            let d = pool.handle(id).queue_size();
            assert!(d >= prev);
            prev = d;
            pool.assert_invariants();
        }
    }

    #[test]
    fn test_remove_from_middle() {
        let mut pool = make_pool(5);
        for id in 0..5 {
            pool.remove(id);
            pool.handle_mut(id).pending = id;
            pool.push(id);
        }
        pool.assert_invariants();

        pool.remove(2);
        pool.assert_invariants();
        assert_eq!(pool.len(), 4);

        assert_eq!(pool.pop(), Some(0));
        assert_eq!(pool.pop(), Some(1));
        assert_eq!(pool.pop(), Some(3));
        assert_eq!(pool.pop(), Some(4));
    }

    #[test]
    fn test_load_stats() {
        let stats = LoadStats::from_depths(&[0, 2, 4]);
        assert!((stats.avg - 2.0).abs() < 1e-9);
        assert!((stats.median - 2.0).abs() < 1e-9);
        assert!((stats.stddev - 2.0).abs() < 1e-9);

        let empty = LoadStats::from_depths(&[]);
        assert_eq!(empty.avg, 0.0);
    }
}
