//! dupscan - Parallel Duplicate File Finder
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use dupscan::config::{CliArgs, Config};
use dupscan::finder::Finder;
use dupscan::output::open_sink;
use dupscan::progress::ProgressReporter;
use std::io::{BufWriter, Write};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse();

    // Setup logging
    setup_logging(args.verbose)?;

    // Validate and create config
    let config = Config::from_args(args).context("Invalid configuration")?;

    // Open the report destination before doing any work; an uncreatable
    // output makes the whole run pointless.
    let sink = open_sink(&config.output_path).context("Failed to open output")?;
    let mut report = BufWriter::new(sink);

    let finder = Finder::new(config.worker_count).context("Failed to start worker pool")?;

    // Live progress ticker, fed from the finder's counters
    let progress = if config.show_progress {
        Some(ProgressReporter::new())
    } else {
        None
    };
    let ticker_stop = Arc::new(AtomicBool::new(false));
    let ticker = progress.as_ref().map(|p| {
        let reporter = p.clone();
        let stats = finder.stats();
        let stop = Arc::clone(&ticker_stop);
        thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                reporter.update(&stats.snapshot());
                thread::sleep(Duration::from_millis(150));
            }
        })
    });

    let started = Instant::now();

    let dups = finder
        .find_dups(config.roots.clone(), config.fast_prefix)
        .context("Failed to start scan")?;

    // One line per duplicate instance; the stream closes once every
    // pipeline stage has drained.
    for dup in dups {
        writeln!(report, "{dup}").context("Failed to write report line")?;
    }
    report.flush().context("Failed to flush report")?;

    let elapsed = started.elapsed();

    ticker_stop.store(true, Ordering::Relaxed);
    if let Some(handle) = ticker {
        let _ = handle.join();
    }
    if let Some(p) = progress {
        p.finish("scan complete");
    }

    if config.show_stats {
        eprintln!("{}", finder.snapshot().report_line(elapsed));
    }

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("dupscan=info,warn")
    } else {
        EnvFilter::new("dupscan=warn")
    };

    // The report owns stdout; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    Ok(())
}
