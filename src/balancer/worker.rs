//! Worker threads for the load balancer
//!
//! Each worker owns a bounded job intake and executes jobs one at a time,
//! strictly in enqueue order. After every job it publishes its id to the
//! completion sink so the dispatcher can reconcile its depth.
//!
//! The pending-depth counter lives on the dispatch-side handle and is
//! adjusted only by the dispatcher (on enqueue and on completion); the
//! worker thread itself never touches it.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use tracing::trace;

/// A unit of deferred work with no return value
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Capacity of each worker's intake queue
pub const MAX_WORK_QUEUE_DEPTH: usize = 10;

/// Execution side of a worker: runs on its own thread
pub(crate) struct Worker {
    id: usize,
    intake: Receiver<Job>,
    done: Sender<usize>,
}

impl Worker {
    /// Pull jobs until the intake disconnects and drains, signalling the
    /// completion sink after each one
    pub(crate) fn run(self) {
        for job in self.intake.iter() {
            job();
            // The sink disappears during shutdown; nothing left to reconcile.
            let _ = self.done.send(self.id);
        }
        trace!(worker = self.id, "worker exiting");
    }

    /// Execute exactly one queued job and signal completion; lets tests
    /// step the worker loop by hand
    #[cfg(test)]
    pub(crate) fn run_one(&self) {
        let job = self.intake.recv().expect("no job queued");
        job();
        let _ = self.done.send(self.id);
    }
}

/// Dispatch side of a worker: intake sender plus the depth the pool orders by
pub(crate) struct WorkerHandle {
    intake: Sender<Job>,
    /// Jobs lodged but not yet reconciled as complete. Maintained solely by
    /// the dispatch loop; this is the pool's ordering key.
    pub(crate) pending: usize,
    /// Current position in the pool heap, kept in sync by the pool on every
    /// swap so removal needs no search.
    pub(crate) heap_pos: usize,
}

/// Sentinel heap position for a worker not currently in the heap
pub(crate) const NOT_IN_HEAP: usize = usize::MAX;

impl WorkerHandle {
    /// Non-blocking enqueue; hands the job back on a full intake
    pub(crate) fn enqueue(&self, job: Job) -> Result<(), TrySendError<Job>> {
        self.intake.try_send(job)
    }

    /// Current depth of the worker's intake
    pub(crate) fn queue_size(&self) -> usize {
        self.pending
    }

    /// Number of jobs actually sitting in the intake channel
    #[cfg(test)]
    pub(crate) fn intake_len(&self) -> usize {
        self.intake.len()
    }
}

/// Create a connected worker / handle pair
pub(crate) fn worker_pair(id: usize, done: Sender<usize>) -> (Worker, WorkerHandle) {
    let (intake_tx, intake_rx) = crossbeam_channel::bounded(MAX_WORK_QUEUE_DEPTH);
    (
        Worker {
            id,
            intake: intake_rx,
            done,
        },
        WorkerHandle {
            intake: intake_tx,
            pending: 0,
            heap_pos: NOT_IN_HEAP,
        },
    )
}
