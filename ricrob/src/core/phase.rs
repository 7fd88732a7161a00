//! Per-dispatch lifecycle.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Lifecycle of one dispatch. Phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DispatchPhase {
    /// Runners not yet all launched.
    Pending,
    /// All runners launched, no outcome emitted yet.
    Running,
    /// All runners launched, at least one outcome emitted, conduit open.
    Draining,
    /// Every outcome emitted and the conduit closed.
    Closed,
}

/// Shared counters the phase is derived from.
///
/// Counters are monotonic, so a derived phase never goes backwards.
#[derive(Debug)]
pub struct Progress {
    total: usize,
    launched: AtomicUsize,
    delivered: AtomicUsize,
    closed: AtomicBool,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            launched: AtomicUsize::new(0),
            delivered: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn mark_launched(&self) {
        self.launched.fetch_add(1, Ordering::AcqRel);
    }

    pub fn mark_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::AcqRel);
    }

    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> DispatchPhase {
        if self.closed.load(Ordering::Acquire) {
            return DispatchPhase::Closed;
        }
        if self.launched.load(Ordering::Acquire) < self.total {
            return DispatchPhase::Pending;
        }
        if self.delivered.load(Ordering::Acquire) == 0 {
            DispatchPhase::Running
        } else {
            DispatchPhase::Draining
        }
    }
}
