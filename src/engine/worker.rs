//! Comparator worker threads
//!
//! Each worker:
//! - Takes units from the shared filled queue (first available)
//! - Classifies them against tree 2
//! - Sends them on its own output channel
//!
//! A worker exits once the filled queue is closed and drained, which closes
//! its output channel.

use crate::engine::classify::classify;
use crate::engine::options::RunContext;
use crate::engine::pool::FilledReceiver;
use crate::engine::stop::StopSignal;
use crate::engine::unit::{Classification, ComparisonUnit};
use crate::error::EngineError;
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace, warn};

/// Statistics collected by a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Units classified by this worker
    pub compared: AtomicU64,

    /// Units forwarded unchanged (ignored or walk errors)
    pub passed_through: AtomicU64,

    /// Units this worker classified as errors
    pub errors: AtomicU64,
}

impl WorkerStats {
    fn record_compared(&self) {
        self.compared.fetch_add(1, Ordering::Relaxed);
    }

    fn record_passed_through(&self) {
        self.passed_through.fetch_add(1, Ordering::Relaxed);
    }

    fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }
}

/// A worker thread that classifies comparison units
pub struct Worker {
    /// Worker ID
    id: usize,

    /// Thread handle
    handle: Option<JoinHandle<Result<(), EngineError>>>,

    /// Worker statistics
    stats: Arc<WorkerStats>,
}

impl Worker {
    /// Spawn a new worker thread
    pub fn spawn(
        id: usize,
        ctx: Arc<RunContext>,
        filled: FilledReceiver,
        output: Sender<ComparisonUnit>,
        stop: StopSignal,
    ) -> Result<Self, EngineError> {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("comparator-{}", id))
            .spawn(move || {
                let _guard = PanicGuard { stop: &stop };
                let result = worker_loop(id, &ctx, &filled, &output, &stats_clone);
                if let Err(e) = &result {
                    warn!(worker = id, error = %e, "Worker stopping the run");
                    stop.trigger();
                }
                result
            })
            .map_err(|e| EngineError::SpawnFailed {
                stage: format!("comparator-{}", id),
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get worker statistics
    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<(), EngineError> {
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(result) => result,
                Err(_) => Err(EngineError::Panicked {
                    stage: format!("comparator-{}", self.id),
                }),
            }
        } else {
            Ok(())
        }
    }
}

/// Stops the run if the worker thread unwinds while holding a unit
struct PanicGuard<'a> {
    stop: &'a StopSignal,
}

impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.stop.trigger();
        }
    }
}

/// Main worker loop
fn worker_loop(
    id: usize,
    ctx: &RunContext,
    filled: &FilledReceiver,
    output: &Sender<ComparisonUnit>,
    stats: &WorkerStats,
) -> Result<(), EngineError> {
    debug!(worker = id, "Worker starting");

    while let Some(mut unit) = filled.take() {
        if unit.classification.is_terminal() {
            stats.record_passed_through();
        } else {
            if unit.path2.as_os_str().is_empty() {
                unit.compute_path2(&ctx.tree1, &ctx.tree2);
            }
            classify(&mut unit, &ctx.options)?;
            stats.record_compared();
            if unit.classification == Classification::Error {
                stats.record_error();
            }
            trace!(
                worker = id,
                path = %unit.path1.display(),
                result = ?unit.classification,
                "Classified"
            );
        }

        output.send(unit).map_err(|_| EngineError::ChannelClosed {
            stage: format!("comparator-{} output", id),
        })?;
    }

    debug!(
        worker = id,
        compared = stats.compared.load(Ordering::Relaxed),
        "Worker shutting down"
    );

    Ok(())
}

/// Aggregate statistics from multiple workers: (compared, passed through, errors)
pub fn aggregate_stats(workers: &[Worker]) -> (u64, u64, u64) {
    let mut compared = 0u64;
    let mut passed_through = 0u64;
    let mut errors = 0u64;

    for worker in workers {
        compared += worker.stats.compared.load(Ordering::Relaxed);
        passed_through += worker.stats.passed_through.load(Ordering::Relaxed);
        errors += worker.stats.errors.load(Ordering::Relaxed);
    }

    (compared, passed_through, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::options::CompareOptions;
    use crate::engine::pool::filled_queue;
    use crate::fs::EntryMeta;
    use crossbeam_channel::unbounded;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn test_worker_stats() {
        let stats = WorkerStats::default();

        stats.record_compared();
        stats.record_compared();
        stats.record_passed_through();
        stats.record_error();

        assert_eq!(stats.compared.load(Ordering::Relaxed), 2);
        assert_eq!(stats.passed_through.load(Ordering::Relaxed), 1);
        assert_eq!(stats.errors.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_worker_classifies_and_closes_output() {
        let t1 = tempfile::tempdir().unwrap();
        let t2 = tempfile::tempdir().unwrap();
        std::fs::write(t1.path().join("gone"), b"x").unwrap();

        let ctx = Arc::new(RunContext::new(t1.path(), t2.path(), CompareOptions::new()));
        let (filled_tx, filled_rx) = filled_queue(2);
        let (out_tx, out_rx) = unbounded();
        let stop = StopSignal::new(Arc::new(AtomicBool::new(false)));

        let worker = Worker::spawn(0, ctx, filled_rx, out_tx, stop).unwrap();

        let mut missing = ComparisonUnit::new();
        missing.set_path1(&t1.path().join("gone"));
        missing.meta1 = Some(EntryMeta::lstat(&missing.path1).unwrap());
        filled_tx.publish(missing).unwrap();

        let mut ignored = ComparisonUnit::new();
        ignored.set_path1(&t1.path().join("skip"));
        ignored.classify(Classification::Ignored);
        filled_tx.publish(ignored).unwrap();
        drop(filled_tx);

        let results: Vec<Classification> = out_rx.iter().map(|u| u.classification).collect();
        assert_eq!(results, vec![Classification::Missing, Classification::Ignored]);

        assert_eq!(worker.stats().compared.load(Ordering::Relaxed), 1);
        assert_eq!(worker.stats().passed_through.load(Ordering::Relaxed), 1);
        worker.join().unwrap();
    }

    #[test]
    fn test_unit_without_metadata_fails_worker_and_stops_run() {
        let t1 = tempfile::tempdir().unwrap();
        let t2 = tempfile::tempdir().unwrap();

        let ctx = Arc::new(RunContext::new(t1.path(), t2.path(), CompareOptions::new()));
        let (filled_tx, filled_rx) = filled_queue(2);
        let (out_tx, out_rx) = unbounded();
        let stop = StopSignal::new(Arc::new(AtomicBool::new(false)));

        let worker = Worker::spawn(0, ctx, filled_rx, out_tx, stop.clone()).unwrap();

        let mut bare = ComparisonUnit::new();
        bare.set_path1(&t1.path().join("bare"));
        filled_tx.publish(bare).unwrap();

        // The worker exits without forwarding the unit
        assert!(out_rx.iter().next().is_none());
        assert!(matches!(
            worker.join(),
            Err(EngineError::InvariantViolation { .. })
        ));
        assert!(stop.is_set());
    }
}
