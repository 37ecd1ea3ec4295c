use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Counts queued and running background exports. The counter is raised before a task is queued and lowered when
/// its [`WorkGuard`] drops, so a task that fails or panics still releases its slot.
#[derive(Default)]
pub struct WorkTracker {
    in_flight: Mutex<usize>,
    idle: Condvar,
}

pub struct WorkGuard {
    tracker: Arc<WorkTracker>,
}

impl WorkTracker {
    pub fn new() -> Arc<Self> {
        Arc::new(WorkTracker::default())
    }

    pub fn start(self: &Arc<Self>) -> WorkGuard {
        *self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner) += 1;

        WorkGuard { tracker: self.clone() }
    }

    pub fn outstanding(&self) -> usize {
        *self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until nothing is in flight or `timeout` elapsed. Returns whether the tracker is idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        while *in_flight > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }

            in_flight = self
                .idle
                .wait_timeout(in_flight, remaining)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }

        true
    }
}

impl Drop for WorkGuard {
    fn drop(&mut self) {
        let mut in_flight = self
            .tracker
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        *in_flight = in_flight.saturating_sub(1);
        if *in_flight == 0 {
            self.tracker.idle.notify_all();
        }
    }
}
