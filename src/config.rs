//! Configuration types for dupscan
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation

use crate::error::ConfigError;
use clap::Parser;
use std::path::{Path, PathBuf};

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Workers per core by default; hashing jobs spend most of their time in
/// I/O, so the pool oversubscribes the CPUs.
const WORKER_MULTIPLIER: usize = 8;

/// Parallel duplicate file finder
#[derive(Parser, Debug, Clone)]
#[command(
    name = "dupscan",
    version,
    about = "Find duplicate files across directory trees",
    long_about = "Walks one or more directory trees in parallel and reports every group of\n\
                  byte-identical files, one line per copy:\n\n\
                  \tSHA1:COUNT:SIZE:\"PATH\"\n\n\
                  Candidates are narrowed by size, then by a fast hash of the first 4 KiB,\n\
                  then confirmed with a full-content SHA-1.",
    after_help = "EXAMPLES:\n    \
        dupscan ~/photos\n    \
        dupscan -w 32 --stats /data /backup\n    \
        dupscan -o dups.txt --full-hash-only /srv\n    \
        dupscan -o /dev/null --stats .  # counts only"
)]
pub struct CliArgs {
    /// Directory trees to scan
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Output file ('-' for stdout)
    #[arg(short = 'o', long, default_value = "-", value_name = "FILE")]
    pub output: PathBuf,

    /// Number of worker threads
    #[arg(
        short = 'w',
        long,
        default_value_t = default_workers(),
        value_name = "NUM"
    )]
    pub workers: usize,

    /// Print a one-line run summary to stderr on completion
    #[arg(long)]
    pub stats: bool,

    /// Skip the fast prefix-hash stage; digest full content directly
    #[arg(long)]
    pub full_hash_only: bool,

    /// Show a live progress spinner on stderr
    #[arg(short = 'p', long)]
    pub progress: bool,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (show per-entry warnings)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

fn default_workers() -> usize {
    num_cpus::get() * WORKER_MULTIPLIER
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Roots to walk, in the order given
    pub roots: Vec<PathBuf>,

    /// Report destination ('-' means stdout)
    pub output_path: PathBuf,

    /// Worker pool size
    pub worker_count: usize,

    /// Emit the stats line at the end
    pub show_stats: bool,

    /// Run the prefix-hash stage before full hashing
    pub fast_prefix: bool,

    /// Show the progress spinner
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,
}

impl Config {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> Result<Self, ConfigError> {
        if args.workers == 0 || args.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: args.workers,
                max: MAX_WORKERS,
            });
        }

        // Catch a doomed output path before the walk, not after it.
        if args.output != Path::new("-") {
            if let Some(parent) = args.output.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    return Err(ConfigError::InvalidOutputPath {
                        path: args.output.clone(),
                        reason: format!("Parent directory '{}' does not exist", parent.display()),
                    });
                }
            }
        }

        let roots = if args.paths.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            args.paths
        };

        Ok(Self {
            roots,
            output_path: args.output,
            worker_count: args.workers,
            show_stats: args.stats,
            fast_prefix: !args.full_hash_only,
            show_progress: args.progress && !args.quiet,
            verbose: args.verbose,
        })
    }
}
