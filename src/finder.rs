//! Duplicate finder: the concrete pipeline
//!
//! Wires the walker, scheduler, and map-reduce core into the candidate-
//! narrowing pipeline:
//!
//! 1. walk every root, emit one node per regular file, dedup by path
//!    (overlapping roots list a file twice; its cleaned path does not)
//! 2. bucket by size, keep only sizes that recur
//! 3. bucket by prefix digest (first 4 KiB), keep recurring digests
//! 4. bucket by full digest, keep recurring digests
//! 5. group by digest and emit every member with its copy count
//!
//! Stage 3 is optional; it only exists to skip full reads of files whose
//! first block already differs.
//!
//! Hashing stages fan out one scheduler job per candidate and hold their
//! output open on a wait group until the last job lands. A candidate whose
//! content cannot be fully read is dropped with a warning: duplicates are
//! never asserted on incomplete data.

use crate::balancer::Scheduler;
use crate::error::Result;
use crate::fstree;
use crate::mapreduce::{self, filter_duplicates, filter_uniques, MapFn, ReduceFn, Stage};
use crate::node::{Dup, Node};
use crate::sync::WaitGroup;
use crossbeam_channel::Receiver;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Run counters, incremented from worker and stage threads
#[derive(Debug, Default)]
pub struct FinderStats {
    /// Directories seen by the walker
    pub total_dirs: AtomicU64,

    /// Regular files seen by the walker
    pub total_files: AtomicU64,

    /// Duplicate instances emitted (every member of every class)
    pub total_dup_instances: AtomicU64,

    /// Σ size × (count − 1) across emitted classes
    pub total_wasted_bytes: AtomicU64,
}

impl FinderStats {
    fn record_dir(&self) {
        self.total_dirs.fetch_add(1, Ordering::Relaxed);
    }

    fn record_file(&self) {
        self.total_files.fetch_add(1, Ordering::Relaxed);
    }

    fn record_dup(&self) {
        self.total_dup_instances.fetch_add(1, Ordering::Relaxed);
    }

    fn record_wasted(&self, bytes: u64) {
        self.total_wasted_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            dirs: self.total_dirs.load(Ordering::Relaxed),
            files: self.total_files.load(Ordering::Relaxed),
            dup_instances: self.total_dup_instances.load(Ordering::Relaxed),
            wasted_bytes: self.total_wasted_bytes.load(Ordering::Relaxed),
        }
    }
}

/// Plain-value view of [`FinderStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub dirs: u64,
    pub files: u64,
    pub dup_instances: u64,
    pub wasted_bytes: u64,
}

impl StatsSnapshot {
    /// The one-line run summary emitted under `--stats`
    pub fn report_line(&self, elapsed: Duration) -> String {
        const GIB: f64 = 1024.0 * 1024.0 * 1024.0;
        format!(
            "examined {} files in {} directories [{:?}], found {} dups, total wasted space {:.2} GiB",
            self.files,
            self.dirs,
            elapsed,
            self.dup_instances,
            self.wasted_bytes as f64 / GIB,
        )
    }
}

/// Duplicate file finder over a shared worker pool
pub struct Finder {
    sched: Scheduler,
    stats: Arc<FinderStats>,
}

impl Finder {
    /// Create a finder backed by `workers` worker threads
    pub fn new(workers: usize) -> Result<Self> {
        Ok(Self::with_scheduler(Scheduler::new(workers)?))
    }

    /// Create a finder on an existing scheduler
    pub fn with_scheduler(sched: Scheduler) -> Self {
        Self {
            sched,
            stats: Arc::new(FinderStats::default()),
        }
    }

    /// Shared handle to the live counters (for progress display)
    pub fn stats(&self) -> Arc<FinderStats> {
        Arc::clone(&self.stats)
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Start the pipeline over `roots` and return the duplicate stream
    ///
    /// Every root must be stat-able up front; an unreadable root is the
    /// run's only fatal error. The returned receiver closes once all
    /// sources drain; read the stats after that.
    pub fn find_dups(&self, roots: Vec<PathBuf>, fast_prefix: bool) -> Result<Receiver<Dup>> {
        for root in &roots {
            fs::symlink_metadata(root).map_err(|e| {
                io::Error::new(e.kind(), format!("cannot stat root '{}': {e}", root.display()))
            })?;
        }

        let mut stages = vec![self.collect_stage(roots), self.size_stage()];
        if fast_prefix {
            stages.push(self.hash_stage(true));
        }
        stages.push(self.hash_stage(false));

        let survivors = mapreduce::pipeline(stages);
        Ok(self.group_stage(survivors))
    }

    /// Walk stage: emit path-keyed nodes for every regular file, dedup by path
    fn collect_stage(&self, roots: Vec<PathBuf>) -> Stage<Node> {
        let sched = self.sched.clone();
        let stats = Arc::clone(&self.stats);

        let map_fn: MapFn<PathBuf, Node> = Box::new(move |out, _generator_input| {
            for root in roots {
                let out = out.clone();
                let stats = Arc::clone(&stats);

                let walked = fstree::walk(&sched, &root, move |path, meta, err| {
                    if let Some(e) = err {
                        warn!(path = %path.display(), error = %e, "skipping unstattable entry");
                        return Ok(());
                    }
                    let meta = match meta {
                        Some(m) => m,
                        None => return Ok(()),
                    };

                    if meta.is_dir() {
                        stats.record_dir();
                    }
                    if meta.is_file() {
                        stats.record_file();
                        let node = Node::new(path.to_path_buf(), meta.len());
                        let _ = out.send((node.path.clone(), node));
                    }
                    Ok(())
                });

                // The root was stat-able when the pipeline started; losing
                // it mid-run degrades to a skipped root, not an abort.
                if let Err(e) = walked {
                    error!(root = %root.display(), error = %e, "root walk failed");
                }
            }
        });

        Stage::new(map_fn, filter_duplicates())
    }

    /// Size stage: a file without a same-size peer cannot be a duplicate
    fn size_stage(&self) -> Stage<Node> {
        let map_fn: MapFn<u64, Node> = Box::new(|out, input| {
            for node in input {
                if out.send((node.size, node)).is_err() {
                    return;
                }
            }
        });

        Stage::new(map_fn, filter_uniques())
    }

    /// Hash stage: digest candidates on the worker pool, keep recurring digests
    fn hash_stage(&self, fast: bool) -> Stage<Node> {
        let sched = self.sched.clone();

        let map_fn: MapFn<String, Node> = Box::new(move |out, input| {
            let wg = WaitGroup::new();

            for mut node in input {
                wg.add(1);
                let out = out.clone();
                let job_wg = wg.clone();

                sched.schedule(move || {
                    match node.compute_hash(fast) {
                        Ok(()) => {
                            let digest = node.hash.clone();
                            let _ = out.send((digest, node));
                        }
                        Err(e) => {
                            // A file we cannot fully read cannot be
                            // asserted to be a duplicate.
                            warn!(error = %e, fast, "dropping candidate");
                        }
                    }
                    job_wg.done();
                });
            }

            // Output must stay open until the last scheduled digest lands.
            wg.wait();
        });

        Stage::new(map_fn, filter_uniques())
    }

    /// Group stage: group by digest, fill in counts, account wasted space
    fn group_stage(&self, input: Receiver<Node>) -> Receiver<Dup> {
        let stats = Arc::clone(&self.stats);

        let map_fn: MapFn<String, Node> = Box::new(|out, input| {
            for node in input {
                let digest = node.hash.clone();
                if out.send((digest, node)).is_err() {
                    return;
                }
            }
        });

        let reduce_fn: ReduceFn<String, Node, Dup> = Box::new(move |out, input| {
            let mut by_hash: HashMap<String, Vec<Node>> = HashMap::new();
            for (digest, node) in input {
                by_hash.entry(digest).or_default().push(node);
            }

            for (_, nodes) in by_hash {
                let count = nodes.len();
                if count < 2 {
                    continue;
                }
                stats.record_wasted(nodes[0].size * (count as u64 - 1));
                for node in nodes {
                    stats.record_dup();
                    if out.send(Dup { node, count }).is_err() {
                        return;
                    }
                }
            }
        });

        mapreduce::reduce(mapreduce::map(input, map_fn), reduce_fn)
    }
}
