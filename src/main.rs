//! difftree - Parallel Directory Tree Comparison
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use difftree::config::{CliArgs, CompareConfig, LogTarget};
use difftree::engine::{ComparisonEngine, ComparisonProgress};
use difftree::error::ConfigError;
use difftree::progress::{print_header, print_timing, ProgressReporter};
use std::fs::File;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let args = match CliArgs::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version are not failures
            let code = if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            let _ = e.print();
            return code;
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: CliArgs) -> Result<()> {
    // Validate and create config
    let config = CompareConfig::from_args(args).context("Invalid configuration")?;

    // Setup logging
    setup_logging(&config.log_target, config.verbose)?;

    if config.show_progress {
        print_header(
            &config.tree1,
            &config.tree2,
            config.worker_count,
            config.options.check_hashes,
        );
    }

    let mut engine = ComparisonEngine::new(config.worker_count);

    // Setup signal handler for graceful shutdown
    let shutdown_flag = engine.shutdown_flag();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, shutting down...");
        shutdown_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    // Progress polling thread
    let done = Arc::new(AtomicBool::new(false));
    let poller = if config.show_progress {
        let done = Arc::clone(&done);
        let source = engine.progress_source();
        let start = Instant::now();
        Some(thread::spawn(move || {
            let reporter = ProgressReporter::new();
            reporter.set_status("Comparing...");
            while !done.load(Ordering::Relaxed) {
                reporter.update(&ComparisonProgress::snapshot(&source, start.elapsed()));
                thread::sleep(Duration::from_millis(200));
            }
            reporter.finish_and_clear();
        }))
    } else {
        None
    };

    let result = engine.compare(&config.tree1, &config.tree2, &config.options);

    done.store(true, Ordering::Relaxed);
    if let Some(handle) = poller {
        let _ = handle.join();
    }

    let outcome = result.context("Comparison failed")?;

    print!("{}", engine.summarize());

    if config.show_progress {
        let progress = engine.progress(outcome.duration);
        print_timing(progress.reported, progress.bytes, outcome.duration);
    }

    if !outcome.completed {
        info!("Comparison was interrupted before completion");
    }

    Ok(())
}

fn setup_logging(target: &LogTarget, verbose: bool) -> Result<()> {
    let default_filter = if verbose {
        "difftree=debug"
    } else {
        "difftree=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    match target {
        LogTarget::Discard => {}
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogTarget::File(path) => {
            let file = File::create(path).map_err(|e| ConfigError::LogFile {
                path: path.clone(),
                reason: e.to_string(),
            })?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
                .init();
        }
    }

    Ok(())
}
