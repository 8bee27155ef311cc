//! Job dispatch onto the least-loaded worker
//!
//! The scheduler owns a fixed set of workers and a dispatch loop on its own
//! thread. The loop is the only code that touches the pool heap, so the
//! heap needs no locking: workers communicate back solely through the
//! completion sink, and callers communicate in solely through the
//! submission channel.
//!
//! Dispatch protocol: pop the least-loaded worker, try a non-blocking
//! enqueue, push the worker back. If the intake was full (which, for the
//! minimum-depth worker, means every intake is full) the loop drains one
//! completion to reconcile a depth and retries. Capacity is therefore
//! never an error the caller sees; an overloaded pool just applies
//! backpressure.
//!
//! Shutdown is a channel-closure cascade: dropping the last `Scheduler`
//! handle disconnects the submission channel, the dispatch loop exits and
//! drops the worker intakes, and each worker drains its queue and exits.

use crate::balancer::pool::Pool;
use crate::balancer::worker::{worker_pair, Job, Worker};
use crate::error::SchedulerError;
use crossbeam_channel::{select, Receiver, Sender, TrySendError};
use std::thread;
use tracing::{debug, error, trace};

/// Handle to the worker pool; cheap to clone, shareable across threads
///
/// All clones feed the same dispatch loop. The pool shuts down when the
/// last clone is dropped.
#[derive(Clone)]
pub struct Scheduler {
    submit: Sender<Job>,
}

impl Scheduler {
    /// Start a scheduler with `workers` worker threads
    pub fn new(workers: usize) -> Result<Self, SchedulerError> {
        assert!(workers > 0, "scheduler needs at least one worker");

        let (submit_tx, submit_rx) = crossbeam_channel::unbounded::<Job>();
        let (done_tx, done_rx) = crossbeam_channel::unbounded::<usize>();

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let (worker, handle) = worker_pair(id, done_tx.clone());
            spawn_worker(id, worker)?;
            handles.push(handle);
        }

        let pool = Pool::new(handles);
        thread::Builder::new()
            .name("dispatcher".into())
            .spawn(move || dispatch_loop(pool, submit_rx, done_rx))
            .map_err(|e| SchedulerError::SpawnFailed {
                name: "dispatcher".into(),
                source: e,
            })?;

        Ok(Self { submit: submit_tx })
    }

    /// Route a job to the least-loaded worker
    ///
    /// The job is handed to the dispatch loop; it runs on some worker
    /// thread, after every job already queued on that worker.
    pub fn schedule<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        // Fails only if the dispatcher died, which cannot happen while
        // this handle holds the submission channel open.
        let _ = self.submit.send(Box::new(job));
    }
}

fn spawn_worker(id: usize, worker: Worker) -> Result<(), SchedulerError> {
    let name = format!("worker-{id}");
    thread::Builder::new()
        .name(name.clone())
        .spawn(move || worker.run())
        .map(|_| ())
        .map_err(|e| SchedulerError::SpawnFailed { name, source: e })
}

fn dispatch_loop(mut pool: Pool, submit: Receiver<Job>, done: Receiver<usize>) {
    loop {
        select! {
            recv(submit) -> msg => match msg {
                Ok(job) => dispatch(&mut pool, &done, job),
                Err(_) => break, // all handles dropped
            },
            recv(done) -> msg => {
                if let Ok(id) = msg {
                    completed(&mut pool, id);
                }
            }
        }
    }
    trace!("dispatcher exiting");
    // Dropping the pool closes every intake; workers drain and exit.
}

fn dispatch(pool: &mut Pool, done: &Receiver<usize>, mut job: Job) {
    loop {
        let id = pool.pop().expect("pool is never empty between dispatches");

        match pool.handle(id).enqueue(job) {
            Ok(()) => {
                pool.handle_mut(id).pending += 1;
                pool.push(id);
                trace!(worker = id, depth = pool.handle(id).queue_size(), "job dispatched");
                return;
            }
            Err(TrySendError::Full(returned)) => {
                // The least-loaded intake is full, so every intake is.
                // Reconcile one completion and try again.
                pool.push(id);
                job = returned;
                debug!("worker intakes full, draining a completion before retry");
                match done.recv() {
                    Ok(finished) => completed(pool, finished),
                    Err(_) => {
                        error!("completion sink closed with intakes full, dropping job");
                        return;
                    }
                }
            }
            Err(TrySendError::Disconnected(_)) => {
                // Only possible if the worker thread died.
                error!(worker = id, "worker intake disconnected, dropping job");
                pool.push(id);
                return;
            }
        }
    }
}

fn completed(pool: &mut Pool, id: usize) {
    let handle = pool.handle_mut(id);
    debug_assert!(handle.pending > 0, "completion for idle worker");
    handle.pending = handle.pending.saturating_sub(1);

    // Re-seat the worker so its reduced depth is respected.
    pool.remove(id);
    pool.push(id);
    trace!(worker = id, load = %pool, "completion reconciled");
}
