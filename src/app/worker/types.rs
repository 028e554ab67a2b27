//! Job runner type definitions

use serde::Serialize;

use crate::app::engine::FetchRequest;
use crate::app::session::SessionId;

/// One accepted fetch, owned by the runner until it reaches a terminal state
#[derive(Debug, Clone)]
pub struct FetchJob {
    pub session_id: SessionId,
    pub request: FetchRequest,
}

impl FetchJob {
    pub fn new(session_id: SessionId, request: FetchRequest) -> Self {
        Self {
            session_id,
            request,
        }
    }
}

/// Current state of the job runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunnerState {
    /// Accepting and running jobs
    Running,
    /// No longer accepting jobs, waiting for in-flight ones
    ShuttingDown,
    /// All jobs have stopped
    Shutdown,
}

/// Terminal result of one job, used for logging and counters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Failed { message: String },
}

impl JobOutcome {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Completed)
    }
}

/// Snapshot of runner counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobStats {
    /// Jobs accepted since startup
    pub submitted: u64,
    /// Jobs waiting for a concurrency permit
    pub queued: u64,
    /// Jobs currently inside the engine
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
}

impl JobStats {
    /// Jobs that have not reached a terminal state
    pub fn in_flight(&self) -> u64 {
        self.queued + self.active
    }
}
