//! Bounded job runner
//!
//! Every accepted job gets its own task. A semaphore bounds how many of
//! those tasks may be inside the engine at once; the rest stay
//! `Initializing` until a permit frees up. Inside a job the engine runs in a
//! nested task so that a panic surfaces as a `JoinError` instead of tearing
//! down the job, while the job's own task drains the progress channel.

use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use super::config::JobRunnerConfig;
use super::stats::JobCounters;
use super::types::{FetchJob, JobOutcome, JobStats, RunnerState};
use crate::app::engine::{FetchEngine, FetchRequest};
use crate::app::progress::{ProgressNormalizer, ProgressReporter};
use crate::app::session::{SessionId, SessionStatus, SessionStore};
use crate::constants::engine::FALLBACK_TITLE;
use crate::errors::JobError;

/// Recorded when the engine reports success without leaving a file behind
pub const NO_OUTPUT_MESSAGE: &str = "engine produced no output";

/// Recorded for jobs still waiting on a permit when the runner shuts down
pub const SHUTDOWN_MESSAGE: &str = "Job runner shut down before the job started";

/// Runs fetch jobs against an engine with bounded concurrency
#[derive(Debug)]
pub struct JobRunner {
    config: JobRunnerConfig,
    store: Arc<SessionStore>,
    engine: Arc<dyn FetchEngine>,
    semaphore: Arc<Semaphore>,
    counters: Arc<JobCounters>,
    /// Job task handles; finished ones are pruned on submit
    handles: Mutex<Vec<JoinHandle<()>>>,
    state: Mutex<RunnerState>,
}

impl JobRunner {
    pub fn new(
        config: JobRunnerConfig,
        store: Arc<SessionStore>,
        engine: Arc<dyn FetchEngine>,
    ) -> Self {
        info!(
            "Starting job runner with {} concurrent jobs (engine: {})",
            config.max_concurrent,
            engine.name()
        );
        Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            config,
            store,
            engine,
            counters: Arc::new(JobCounters::new()),
            handles: Mutex::new(Vec::new()),
            state: Mutex::new(RunnerState::Running),
        }
    }

    pub fn config(&self) -> &JobRunnerConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<dyn FetchEngine> {
        &self.engine
    }

    /// Launch a job and return without waiting for it
    pub async fn submit(&self, job: FetchJob) -> Result<(), JobError> {
        if *self.state.lock().await != RunnerState::Running {
            return Err(JobError::PoolClosed);
        }

        debug!(session_id = %job.session_id, "Submitting job");
        self.counters.record_submitted();

        let task = JobTask {
            store: self.store.clone(),
            engine: self.engine.clone(),
            semaphore: self.semaphore.clone(),
            counters: self.counters.clone(),
            progress_buffer: self.config.progress_buffer,
        };
        let handle = tokio::spawn(task.run(job));

        let mut handles = self.handles.lock().await;
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
        Ok(())
    }

    pub fn stats(&self) -> JobStats {
        self.counters.snapshot()
    }

    pub async fn state(&self) -> RunnerState {
        *self.state.lock().await
    }

    /// Stop accepting work and wait for in-flight jobs
    ///
    /// Jobs still waiting for a permit are recorded as failed. Running jobs
    /// are given up to `timeout` to finish.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), JobError> {
        {
            let mut state = self.state.lock().await;
            if *state == RunnerState::Shutdown {
                return Ok(());
            }
            *state = RunnerState::ShuttingDown;
        }

        info!("Shutting down job runner");
        self.semaphore.close();

        let handles = std::mem::take(&mut *self.handles.lock().await);
        let waited = tokio::time::timeout(timeout, futures::future::join_all(handles)).await;

        *self.state.lock().await = RunnerState::Shutdown;

        match waited {
            Ok(results) => {
                let crashed = results.iter().filter(|r| r.is_err()).count();
                if crashed > 0 {
                    warn!("{} job tasks ended abnormally during shutdown", crashed);
                }
                info!("Job runner shutdown complete");
                Ok(())
            }
            Err(_) => {
                let pending = self.counters.snapshot().in_flight() as usize;
                warn!(
                    "Job runner shutdown timed out after {:?} with {} jobs running",
                    timeout, pending
                );
                Err(JobError::ShutdownTimeout {
                    seconds: timeout.as_secs(),
                    pending,
                })
            }
        }
    }
}

/// Everything one job task needs, detached from the runner
struct JobTask {
    store: Arc<SessionStore>,
    engine: Arc<dyn FetchEngine>,
    semaphore: Arc<Semaphore>,
    counters: Arc<JobCounters>,
    progress_buffer: usize,
}

impl JobTask {
    async fn run(self, job: FetchJob) {
        let FetchJob {
            session_id,
            request,
        } = job;

        let permit = match self.semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                self.counters.record_abandoned();
                warn!(session_id = %session_id, "Job dropped, runner is shut down");
                self.fail(&session_id, SHUTDOWN_MESSAGE).await;
                return;
            }
        };
        self.counters.record_started();

        let output_path = request.output_path.clone();
        let format = request.format;
        self.store
            .update(&session_id, |record| {
                record.artifact_path = Some(output_path);
                record.format = Some(format);
            })
            .await;

        info!(
            session_id = %session_id,
            engine = self.engine.name(),
            "Job started: {} as {}",
            request.url,
            request.format
        );

        let outcome = self.execute(&session_id, request).await;
        drop(permit);

        match &outcome {
            JobOutcome::Completed => info!(session_id = %session_id, "Job completed"),
            JobOutcome::Failed { message } => {
                warn!(session_id = %session_id, error = %message, "Job failed")
            }
        }
        self.counters.record_finished(&outcome);
    }

    async fn execute(&self, session_id: &SessionId, request: FetchRequest) -> JobOutcome {
        let (reporter, rx) = ProgressReporter::channel(session_id.clone(), self.progress_buffer);
        let normalizer = ProgressNormalizer::new(self.store.clone(), session_id.clone());
        let output_path = request.output_path.clone();

        let engine = self.engine.clone();
        let fetch = tokio::spawn(async move { engine.fetch(&request, reporter).await });

        // The reporter lives inside the fetch task, so the normalizer stops
        // once the engine returns or unwinds.
        let (_, joined) = tokio::join!(normalizer.run(rx), fetch);

        match joined {
            Err(join_error) => {
                let error = JobError::Panicked {
                    message: join_error_message(join_error),
                };
                error!(session_id = %session_id, "{}", error);
                self.fail(session_id, error.to_string()).await
            }
            Ok(Err(engine_error)) => self.fail(session_id, engine_error.to_string()).await,
            Ok(Ok(outcome)) => {
                if !is_file(&output_path).await {
                    return self.fail(session_id, NO_OUTPUT_MESSAGE).await;
                }

                let title = outcome
                    .title
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| FALLBACK_TITLE.to_string());

                let completed = self
                    .store
                    .update(session_id, |record| {
                        record.set_title_if_empty(&title);
                        if record.status == SessionStatus::Downloaded {
                            return Ok(());
                        }
                        // engine returned without a final progress event
                        record.complete()
                    })
                    .await;

                match completed {
                    Some(Ok(())) | None => JobOutcome::Completed,
                    Some(Err(e)) => {
                        debug!(session_id = %session_id, "Could not complete session: {}", e);
                        let message = self
                            .store
                            .get(session_id)
                            .await
                            .ok()
                            .and_then(|record| record.error)
                            .unwrap_or_else(|| e.to_string());
                        JobOutcome::failed(message)
                    }
                }
            }
        }
    }

    /// Record a failure; a record that is already terminal keeps its state
    async fn fail(&self, session_id: &SessionId, message: impl Into<String>) -> JobOutcome {
        let message = message.into();
        let applied = self
            .store
            .update(session_id, |record| record.fail(message.clone()))
            .await;
        if let Some(Err(e)) = applied {
            debug!(session_id = %session_id, "Failure not recorded: {}", e);
        }
        JobOutcome::failed(message)
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

fn join_error_message(join_error: JoinError) -> String {
    if join_error.is_cancelled() {
        return "engine task was cancelled".to_string();
    }
    panic_payload_message(join_error.into_panic())
}

fn panic_payload_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
