//! Load-balanced worker pool
//!
//! This module provides the job execution substrate the walker and the
//! hash stages run on:
//!
//! - [`worker`]: worker threads with bounded FIFO intakes
//! - [`pool`]: min-heap of workers keyed by queue depth
//! - [`scheduler`]: the dispatch loop routing jobs to the least-loaded
//!   worker
//!
//! Jobs are opaque closures with no return value; anything a job produces
//! travels over channels the job captures. Least-loaded placement is
//! best-effort: depth is observed at dispatch time and may have moved by
//! the time the worker starts the job.

pub mod pool;
pub mod scheduler;
pub mod worker;

pub use pool::LoadStats;
pub use scheduler::Scheduler;
pub use worker::{Job, MAX_WORK_QUEUE_DEPTH};
