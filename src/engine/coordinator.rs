//! Comparison engine - orchestrates one pass of the pipeline
//!
//! ```text
//!  walker ──► filled queue ──► comparator-0 ─┐
//!    ▲                    ├──► comparator-1 ─┼─► merger ──► reporter
//!    │                    └──► comparator-N ─┘                 │
//!    └──────────────────── free pool ◄─────────────────────────┘
//! ```
//!
//! The engine is responsible for:
//! - Building the pool and channels for a run
//! - Starting the walker, workers and merger threads
//! - Running the reporter on the calling thread
//! - Joining every thread and checking the pool afterwards
//! - Keeping the counters for the summary

use crate::engine::counters::Counters;
use crate::engine::merge::Merger;
use crate::engine::options::{CompareOptions, RunContext};
use crate::engine::pool::{filled_queue, UnitPool};
use crate::engine::reporter::{ReportProgress, Reporter};
use crate::engine::stop::StopSignal;
use crate::engine::walker::{TreeWalker, WalkSummary};
use crate::engine::worker::{aggregate_stats, Worker};
use crate::error::{EngineError, EngineResult, Result};
use crossbeam_channel::bounded;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Result of a completed comparison
#[derive(Debug, Clone)]
pub struct CompareOutcome {
    /// Per-classification counts
    pub counters: Counters,

    /// Time taken for the run
    pub duration: Duration,

    /// Whether every entry of tree 1 was visited (vs interrupted)
    pub completed: bool,

    /// Units the walker produced
    pub units: u64,
}

/// Progress information for display
#[derive(Debug, Clone)]
pub struct ComparisonProgress {
    /// Entries fully processed
    pub reported: u64,

    /// Bytes of regular files processed
    pub bytes: u64,

    /// Elapsed time
    pub elapsed: Duration,
}

impl ComparisonProgress {
    /// Read the live counters
    pub fn snapshot(source: &ReportProgress, elapsed: Duration) -> Self {
        Self {
            reported: source.reported.load(Ordering::Relaxed),
            bytes: source.bytes.load(Ordering::Relaxed),
            elapsed,
        }
    }

    /// Calculate entries per second rate
    pub fn entries_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.reported as f64 / secs
        } else {
            0.0
        }
    }
}

/// Compares two directory trees
pub struct ComparisonEngine {
    /// Number of comparator threads
    worker_count: usize,

    /// User shutdown request (for signal handlers)
    shutdown: Arc<AtomicBool>,

    /// Live progress of the current run
    progress: Arc<ReportProgress>,

    /// Counters of the last run
    counters: Counters,

    /// Pool of the last run, kept for inspection
    pool: Option<UnitPool>,
}

impl ComparisonEngine {
    /// Create an engine with `worker_count` comparators (at least one)
    pub fn new(worker_count: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
            shutdown: Arc::new(AtomicBool::new(false)),
            progress: Arc::new(ReportProgress::default()),
            counters: Counters::default(),
            pool: None,
        }
    }

    /// Create an engine with one comparator per logical CPU
    pub fn with_default_workers() -> Self {
        Self::new(num_cpus::get())
    }

    /// Number of comparator threads
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Get a clone of the shutdown flag (for signal handlers)
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Live progress counters, readable from another thread during a run
    pub fn progress_source(&self) -> Arc<ReportProgress> {
        Arc::clone(&self.progress)
    }

    /// Snapshot of the current run's progress
    pub fn progress(&self, elapsed: Duration) -> ComparisonProgress {
        ComparisonProgress::snapshot(&self.progress, elapsed)
    }

    /// Counters of the last run
    pub fn counters(&self) -> &Counters {
        &self.counters
    }

    /// Pool of the last run
    pub fn pool(&self) -> Option<&UnitPool> {
        self.pool.as_ref()
    }

    /// Summary table of the last run
    pub fn summarize(&self) -> String {
        self.counters.summary()
    }

    /// Compare two trees, writing the report to stdout
    pub fn compare(
        &mut self,
        tree1: &Path,
        tree2: &Path,
        options: &CompareOptions,
    ) -> Result<CompareOutcome> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.compare_to(tree1, tree2, options, &mut out)
    }

    /// Compare two trees, writing the report to `out`
    ///
    /// Blocks until the run finishes. Per-path differences and failures are
    /// counted and reported; only engine faults return an error.
    pub fn compare_to<W: Write>(
        &mut self,
        tree1: &Path,
        tree2: &Path,
        options: &CompareOptions,
        out: &mut W,
    ) -> Result<CompareOutcome> {
        let start = Instant::now();
        let ctx = Arc::new(RunContext::new(tree1, tree2, options.clone()));
        let workers_n = self.worker_count;

        info!(
            tree1 = %ctx.tree1.display(),
            tree2 = %ctx.tree2.display(),
            workers = workers_n,
            check_hashes = options.check_hashes,
            "Starting comparison"
        );

        self.counters = Counters::default();
        self.progress.reset();
        let stop = StopSignal::new(Arc::clone(&self.shutdown));
        let pool = UnitPool::new(workers_n);
        let (filled_tx, filled_rx) = filled_queue(workers_n);

        let mut workers = Vec::with_capacity(workers_n);
        let mut outputs = Vec::with_capacity(workers_n);
        for id in 0..workers_n {
            let (tx, rx) = bounded(0);
            let worker = Worker::spawn(id, Arc::clone(&ctx), filled_rx.clone(), tx, stop.clone())?;
            workers.push(worker);
            outputs.push(rx);
        }
        // Only workers hold the filled receiver from here on
        drop(filled_rx);

        let (merged, merger) = Merger::start(outputs)?;

        let walker = TreeWalker::new(
            Arc::clone(&ctx),
            pool.acquirer(stop.clone()),
            filled_tx,
            stop.clone(),
        );
        let walker_handle = thread::Builder::new()
            .name("tree-walker".to_string())
            .spawn(move || walker.walk())
            .map_err(|e| EngineError::SpawnFailed {
                stage: "tree-walker".to_string(),
                reason: e.to_string(),
            })?;

        let report = Reporter::new(&ctx.tree1, out, pool.recycler(), &self.progress, stop.clone())
            .run(merged);

        // The merged stream has closed, so every stage is finishing
        let walk_result: EngineResult<WalkSummary> = walker_handle.join().unwrap_or_else(|_| {
            Err(EngineError::Panicked {
                stage: "tree-walker".to_string(),
            })
        });

        let (compared, passed_through, entry_errors) = aggregate_stats(&workers);
        let mut worker_result = Ok(());
        for worker in workers {
            let id = worker.id();
            if let Err(e) = worker.join() {
                warn!(worker = id, error = %e, "Worker failed");
                if worker_result.is_ok() {
                    worker_result = Err(e);
                }
            }
        }

        let merge_result = merger.join();

        let stats = pool.stats();
        let available = pool.available();
        let capacity = pool.capacity();
        debug!(
            compared,
            passed_through,
            entry_errors,
            stalls = stats.stall_count(),
            peak_in_flight = stats.peak(),
            "Pipeline finished"
        );
        self.pool = Some(pool);

        // A failed worker closes channels under the walker, so report it first
        worker_result?;
        let counters = report?;
        let walk = walk_result?;
        merge_result?;
        if available != capacity {
            return Err(EngineError::UnitsLost {
                expected: capacity,
                found: available,
            }
            .into());
        }

        self.counters = counters;
        let outcome = CompareOutcome {
            counters,
            duration: start.elapsed(),
            completed: !walk.cancelled,
            units: walk.units,
        };

        info!(
            units = outcome.units,
            differences = counters.differences(),
            errors = counters.errors,
            completed = outcome.completed,
            duration_ms = outcome.duration.as_millis() as u64,
            "Comparison completed"
        );

        Ok(outcome)
    }
}

impl Default for ComparisonEngine {
    fn default() -> Self {
        Self::with_default_workers()
    }
}
