//! dupscan - Parallel Duplicate File Finder
//!
//! Finds byte-identical files across one or more directory trees and
//! reports every equivalence class with its content digest, copy count,
//! file size, and each member path, plus the storage wasted by the extra
//! copies.
//!
//! # Architecture
//!
//! Three subsystems cooperate over channels:
//!
//! - **Balancer**: a fixed pool of worker threads behind a dispatch loop
//!   that always routes the next job to the least-loaded worker (a
//!   min-heap keyed on queue depth).
//!
//! - **Tree walker**: descends directories by scheduling one job per
//!   directory on the balancer, so sibling subtrees are listed in
//!   parallel; a wait group holds the walk open until the last subtree
//!   finishes.
//!
//! - **Map-reduce pipeline**: back-to-back *(map, reduce)* stages linked
//!   by bounded channels progressively narrow candidates — path dedup,
//!   size bucketing, fast prefix hash, full hash — until only true
//!   duplicates remain.
//!
//! ```text
//!  roots ──► walk ──► dedup ──► size ──► prefix ──► full ──► group ──► report
//!             │       paths    bucket    SHA-1     SHA-1    by hash
//!             │                            │         │
//!             ▼                            ▼         ▼
//!        ┌─────────────────────────────────────────────────┐
//!        │            least-loaded worker pool             │
//!        │   (directory listing jobs and hashing jobs)     │
//!        └─────────────────────────────────────────────────┘
//! ```
//!
//! Termination is a channel-closure cascade: when the walker drains, the
//! first stage closes its output, each stage closes in turn as its input
//! ends, and the report loop exits after the terminal stream closes.
//!
//! # Example
//!
//! ```bash
//! # Report duplicates under the current directory
//! dupscan
//!
//! # Two trees, 32 workers, summary line on stderr
//! dupscan -w 32 --stats /data /backup
//! ```

pub mod balancer;
pub mod config;
pub mod error;
pub mod finder;
pub mod fstree;
pub mod mapreduce;
pub mod node;
pub mod output;
pub mod progress;
pub mod sync;

pub use balancer::Scheduler;
pub use config::{CliArgs, Config};
pub use error::{DupscanError, Result};
pub use finder::{Finder, FinderStats, StatsSnapshot};
pub use node::{Dup, Node};
