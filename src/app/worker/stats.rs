//! Lock-free job counters

use std::sync::atomic::{AtomicU64, Ordering};

use super::types::{JobOutcome, JobStats};

/// Counters shared between the runner and its job tasks
#[derive(Debug, Default)]
pub struct JobCounters {
    submitted: AtomicU64,
    queued: AtomicU64,
    active: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
}

impl JobCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        self.queued.fetch_add(1, Ordering::Relaxed);
    }

    /// A queued job obtained a permit
    pub fn record_started(&self) {
        self.queued.fetch_sub(1, Ordering::Relaxed);
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    /// A queued job was dropped without running
    pub fn record_abandoned(&self) {
        self.queued.fetch_sub(1, Ordering::Relaxed);
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_finished(&self, outcome: &JobOutcome) {
        self.active.fetch_sub(1, Ordering::Relaxed);
        if outcome.is_success() {
            self.completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> JobStats {
        JobStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            queued: self.queued.load(Ordering::Relaxed),
            active: self.active.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}
