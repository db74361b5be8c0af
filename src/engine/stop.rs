//! Run cancellation
//!
//! A run stops early when either the caller's shutdown flag (Ctrl-C) or the
//! run's own internal flag is set. The internal flag is raised on engine
//! faults so that a blocked walker gives up instead of waiting forever.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Combined shutdown signal shared by every stage of a run
#[derive(Debug, Clone)]
pub struct StopSignal {
    /// Caller-owned flag, survives across runs
    user: Arc<AtomicBool>,

    /// Per-run flag
    internal: Arc<AtomicBool>,
}

impl StopSignal {
    /// Create a signal for one run on top of the caller's shutdown flag
    pub fn new(user: Arc<AtomicBool>) -> Self {
        Self {
            user,
            internal: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check whether the run should stop
    pub fn is_set(&self) -> bool {
        self.user.load(Ordering::Relaxed) || self.internal.load(Ordering::Relaxed)
    }

    /// Stop this run without touching the caller's flag
    pub fn trigger(&self) {
        self.internal.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_flag_stops_run() {
        let user = Arc::new(AtomicBool::new(false));
        let stop = StopSignal::new(Arc::clone(&user));
        assert!(!stop.is_set());

        user.store(true, Ordering::SeqCst);
        assert!(stop.is_set());
    }

    #[test]
    fn test_trigger_is_per_run() {
        let user = Arc::new(AtomicBool::new(false));
        let first = StopSignal::new(Arc::clone(&user));
        first.trigger();
        assert!(first.is_set());

        let second = StopSignal::new(user);
        assert!(!second.is_set());
    }
}
