//! Fixed-size pool of comparison units
//!
//! Exactly `workers + 2` units exist for one run. They circulate through
//! two bounded channels:
//!
//! - the free channel (capacity `workers + 2`), from the reporter back to
//!   the walker
//! - the filled queue (capacity `workers`), from the walker to the workers
//!
//! Acquiring from an empty free channel blocks the walker, which is the
//! backpressure that bounds work in flight.

use crate::engine::stop::StopSignal;
use crate::engine::unit::ComparisonUnit;
use crate::error::{EngineError, EngineResult};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Initial capacity of each unit's path buffers
const PATH_CAPACITY: usize = 256;

/// How often a stalled walker re-checks the stop signal
const STALL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Statistics for the unit pool
#[derive(Debug, Default)]
pub struct PoolStats {
    /// Units handed to the walker
    pub acquired: AtomicU64,

    /// Units returned by the reporter
    pub released: AtomicU64,

    /// Times the walker found the pool empty and had to wait
    pub stalls: AtomicU64,

    /// Units currently outside the free channel
    pub in_flight: AtomicUsize,

    /// Highest value `in_flight` reached
    pub peak_in_flight: AtomicUsize,
}

impl PoolStats {
    /// Get number of backpressure stalls
    pub fn stall_count(&self) -> u64 {
        self.stalls.load(Ordering::Relaxed)
    }

    /// Get the peak number of units in flight
    pub fn peak(&self) -> usize {
        self.peak_in_flight.load(Ordering::Relaxed)
    }

    fn record_acquire(&self) {
        self.acquired.fetch_add(1, Ordering::Relaxed);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn record_release(&self) {
        self.released.fetch_add(1, Ordering::Relaxed);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Pool of reusable comparison units
pub struct UnitPool {
    /// Sender side of the free channel
    free_tx: Sender<ComparisonUnit>,

    /// Receiver side of the free channel
    free_rx: Receiver<ComparisonUnit>,

    /// Number of units in circulation
    capacity: usize,

    /// Pool statistics
    stats: Arc<PoolStats>,
}

impl UnitPool {
    /// Allocate `worker_count + 2` units and place them in the free channel
    pub fn new(worker_count: usize) -> Self {
        let capacity = worker_count + 2;
        let (free_tx, free_rx) = bounded(capacity);

        for _ in 0..capacity {
            // Cannot fail: the channel has room for every unit and we hold the receiver
            let _ = free_tx.try_send(ComparisonUnit::with_capacity(PATH_CAPACITY));
        }

        Self {
            free_tx,
            free_rx,
            capacity,
            stats: Arc::new(PoolStats::default()),
        }
    }

    /// Handle the walker uses to take blank units
    pub fn acquirer(&self, stop: StopSignal) -> UnitAcquirer {
        UnitAcquirer {
            free_rx: self.free_rx.clone(),
            stop,
            stats: Arc::clone(&self.stats),
        }
    }

    /// Handle the reporter uses to return units
    pub fn recycler(&self) -> UnitRecycler {
        UnitRecycler {
            free_tx: self.free_tx.clone(),
            stats: Arc::clone(&self.stats),
        }
    }

    /// Number of units in circulation
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of units currently sitting in the free channel
    pub fn available(&self) -> usize {
        self.free_rx.len()
    }

    /// Get pool statistics
    pub fn stats(&self) -> Arc<PoolStats> {
        Arc::clone(&self.stats)
    }

    /// Take every free unit out of the pool
    pub fn drain(&self) -> Vec<ComparisonUnit> {
        self.free_rx.try_iter().collect()
    }
}

/// Walker-side handle for taking blank units
pub struct UnitAcquirer {
    free_rx: Receiver<ComparisonUnit>,
    stop: StopSignal,
    stats: Arc<PoolStats>,
}

impl UnitAcquirer {
    /// Take a blank unit, blocking while the pool is exhausted
    ///
    /// Returns `Ok(None)` if the run is stopped while waiting.
    pub fn acquire(&self) -> EngineResult<Option<ComparisonUnit>> {
        let unit = match self.free_rx.try_recv() {
            Ok(unit) => unit,
            Err(TryRecvError::Empty) => {
                self.stats.stalls.fetch_add(1, Ordering::Relaxed);
                match self.wait_for_unit()? {
                    Some(unit) => unit,
                    None => return Ok(None),
                }
            }
            Err(TryRecvError::Disconnected) => return Err(EngineError::PoolClosed),
        };

        self.stats.record_acquire();
        Ok(Some(unit))
    }

    fn wait_for_unit(&self) -> EngineResult<Option<ComparisonUnit>> {
        loop {
            match self.free_rx.recv_timeout(STALL_POLL_INTERVAL) {
                Ok(unit) => return Ok(Some(unit)),
                Err(RecvTimeoutError::Timeout) => {
                    if self.stop.is_set() {
                        return Ok(None);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return Err(EngineError::PoolClosed),
            }
        }
    }
}

/// Reporter-side handle for returning units
#[derive(Clone)]
pub struct UnitRecycler {
    free_tx: Sender<ComparisonUnit>,
    stats: Arc<PoolStats>,
}

impl UnitRecycler {
    /// Reset a unit and return it to the free channel
    pub fn release(&self, mut unit: ComparisonUnit) -> EngineResult<()> {
        unit.reset();
        // in_flight must drop before the walker can see the unit again
        self.stats.record_release();
        self.free_tx.send(unit).map_err(|_| EngineError::PoolClosed)
    }
}

/// Create the filled queue shared by the walker and the workers
pub fn filled_queue(worker_count: usize) -> (FilledSender, FilledReceiver) {
    let (tx, rx) = bounded(worker_count);
    (FilledSender { tx }, FilledReceiver { rx })
}

/// Walker-side handle of the filled queue; dropping it closes the queue
pub struct FilledSender {
    tx: Sender<ComparisonUnit>,
}

impl FilledSender {
    /// Publish a unit, blocking while the workers are backed up
    pub fn publish(&self, unit: ComparisonUnit) -> EngineResult<()> {
        self.tx.send(unit).map_err(|_| EngineError::FilledQueueClosed)
    }
}

/// Worker-side handle of the filled queue (clone for each worker)
#[derive(Clone)]
pub struct FilledReceiver {
    rx: Receiver<ComparisonUnit>,
}

impl FilledReceiver {
    /// Take the next unit; `None` once the queue is closed and drained
    pub fn take(&self) -> Option<ComparisonUnit> {
        self.rx.recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::AtomicBool;

    fn stop() -> StopSignal {
        StopSignal::new(Arc::new(AtomicBool::new(false)))
    }

    #[test]
    fn test_pool_preallocates_units() {
        let pool = UnitPool::new(4);
        assert_eq!(pool.capacity(), 6);
        assert_eq!(pool.available(), 6);
    }

    #[test]
    fn test_acquire_release_cycle() {
        let pool = UnitPool::new(1);
        let acquirer = pool.acquirer(stop());
        let recycler = pool.recycler();

        let mut unit = acquirer.acquire().unwrap().unwrap();
        unit.set_path1(Path::new("/t1/a"));
        unit.sequence = 3;
        assert_eq!(pool.available(), 2);

        recycler.release(unit).unwrap();
        assert_eq!(pool.available(), 3);
        assert!(pool.drain().iter().all(|u| u.is_reset()));

        let stats = pool.stats();
        assert_eq!(stats.acquired.load(Ordering::Relaxed), 1);
        assert_eq!(stats.released.load(Ordering::Relaxed), 1);
        assert_eq!(stats.peak(), 1);
    }

    #[test]
    fn test_exhausted_pool_blocks_until_release() {
        let pool = UnitPool::new(0);
        let acquirer = pool.acquirer(stop());
        let recycler = pool.recycler();

        let first = acquirer.acquire().unwrap().unwrap();
        let _second = acquirer.acquire().unwrap().unwrap();
        assert_eq!(pool.available(), 0);

        let releaser = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(20));
            recycler.release(first).unwrap();
        });

        let third = acquirer.acquire().unwrap().unwrap();
        assert!(third.is_reset());
        releaser.join().unwrap();

        assert_eq!(pool.stats().stall_count(), 1);
        assert_eq!(pool.stats().peak(), 2);
    }

    #[test]
    fn test_stalled_acquire_gives_up_on_stop() {
        let pool = UnitPool::new(0);
        let signal = stop();
        let acquirer = pool.acquirer(signal.clone());

        let _a = acquirer.acquire().unwrap().unwrap();
        let _b = acquirer.acquire().unwrap().unwrap();

        signal.trigger();
        assert!(acquirer.acquire().unwrap().is_none());
    }

    #[test]
    fn test_filled_queue_closes_when_sender_dropped() {
        let (tx, rx) = filled_queue(2);
        tx.publish(ComparisonUnit::new()).unwrap();
        drop(tx);

        assert!(rx.take().is_some());
        assert!(rx.take().is_none());
    }

    #[test]
    fn test_publish_after_workers_gone_fails() {
        let (tx, rx) = filled_queue(1);
        drop(rx);
        assert!(matches!(
            tx.publish(ComparisonUnit::new()),
            Err(EngineError::FilledQueueClosed)
        ));
    }
}
