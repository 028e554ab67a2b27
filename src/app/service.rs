//! Fetch service
//!
//! The orchestration layer behind the HTTP surface. Validates requests,
//! creates session records, hands jobs to the [`JobRunner`] and serves
//! progress snapshots and finished artifacts.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::app::artifact::{download_name, ArtifactConfig, ArtifactManager};
use crate::app::engine::{
    normalize_source_url, EngineConfig, FetchEngine, FetchRequest, MediaFormat, MediaInfo,
    Resolution,
};
use crate::app::session::{ProgressSnapshot, SessionId, SessionStats, SessionStatus, SessionStore};
use crate::app::worker::{FetchJob, JobRunner, JobRunnerConfig, JobStats};
use crate::constants::engine as engine_defaults;
use crate::errors::{EngineError, JobError, ServiceError, ServiceResult};

/// Fields of a download request as submitted by a client
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DownloadRequest {
    pub url: String,
    /// `mp4` or `mp3`; empty means `mp4`
    pub format: String,
    /// `720p` style height; empty means the default
    pub resolution: String,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_resolution(mut self, resolution: impl Into<String>) -> Self {
        self.resolution = resolution.into();
        self
    }
}

/// Metadata returned by `video_info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub title: String,
    /// `H:MM:SS`
    pub duration: String,
    pub thumbnail: String,
}

impl From<MediaInfo> for VideoInfo {
    fn from(info: MediaInfo) -> Self {
        let duration = info.duration_display();
        Self {
            title: info
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| engine_defaults::UNKNOWN_TITLE.to_string()),
            duration,
            thumbnail: info.thumbnail.unwrap_or_default(),
        }
    }
}

/// A finished artifact ready to be served
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub path: PathBuf,
    /// Attachment name presented to the client
    pub download_name: String,
    pub format: MediaFormat,
}

/// Diagnostic counters for the health endpoint
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    pub sessions: SessionStats,
    pub jobs: JobStats,
    pub pending_deletions: usize,
}

/// Probe behaviour before accepting a download
#[derive(Debug, Clone, Copy)]
pub struct ProbePolicy {
    pub enabled: bool,
    pub timeout: Duration,
}

impl From<&EngineConfig> for ProbePolicy {
    fn from(config: &EngineConfig) -> Self {
        Self {
            enabled: config.probe_before_download,
            timeout: config.probe_timeout,
        }
    }
}

/// Orchestrates sessions, jobs and artifacts
#[derive(Debug)]
pub struct FetchService {
    store: Arc<SessionStore>,
    runner: Arc<JobRunner>,
    artifacts: Arc<ArtifactManager>,
    probe: ProbePolicy,
}

impl FetchService {
    pub fn new(
        store: Arc<SessionStore>,
        runner: Arc<JobRunner>,
        artifacts: Arc<ArtifactManager>,
        probe: ProbePolicy,
    ) -> Self {
        Self {
            store,
            runner,
            artifacts,
            probe,
        }
    }

    /// Wire up a store, runner and artifact manager around an engine
    pub async fn build(
        engine: Arc<dyn FetchEngine>,
        engine_config: &EngineConfig,
        jobs: JobRunnerConfig,
        artifacts: ArtifactConfig,
    ) -> crate::errors::Result<Self> {
        let store = Arc::new(SessionStore::new());
        let artifacts = Arc::new(ArtifactManager::new(artifacts, store.clone()).await?);
        let runner = Arc::new(JobRunner::new(jobs, store.clone(), engine));
        Ok(Self::new(store, runner, artifacts, engine_config.into()))
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn runner(&self) -> &Arc<JobRunner> {
        &self.runner
    }

    pub fn artifacts(&self) -> &Arc<ArtifactManager> {
        &self.artifacts
    }

    fn engine(&self) -> &Arc<dyn FetchEngine> {
        self.runner.engine()
    }

    /// Probe a URL for display metadata; creates no session
    pub async fn video_info(&self, url: &str) -> ServiceResult<VideoInfo> {
        let url = validate_url(url)?;
        debug!("Probing {}", url);
        let info = self.probe_url(&url).await?;
        Ok(info.into())
    }

    /// Accept a download and return its session id without waiting for it
    pub async fn start_download(&self, request: DownloadRequest) -> ServiceResult<SessionId> {
        let url = validate_url(&request.url)?;
        let format: MediaFormat = request.format.parse()?;
        let resolution: Resolution = request.resolution.parse()?;

        let session_id = SessionId::generate();
        self.store
            .create(session_id.clone())
            .await
            .map_err(|e| ServiceError::server(e.to_string()))?;
        info!(session_id = %session_id, "Accepted download of {} as {} ({})", url, format, resolution);

        if self.probe.enabled {
            match self.probe_url(&url).await {
                Ok(info) => {
                    if let Some(title) = info.title {
                        self.store
                            .update(&session_id, |record| record.set_title_if_empty(&title))
                            .await;
                    }
                }
                Err(error) => {
                    self.mark_failed(&session_id, &error.to_string()).await;
                    return Err(match error {
                        ServiceError::ResourceUnavailable { message, .. } => {
                            ServiceError::ResourceUnavailable {
                                message,
                                session_id: Some(session_id),
                            }
                        }
                        other => other,
                    });
                }
            }
        }

        let output_path = self.artifacts.output_path(&session_id, format);
        if let Err(e) = self.artifacts.prepare(&output_path).await {
            self.mark_failed(&session_id, "Could not prepare output location")
                .await;
            return Err(ServiceError::server(e.to_string()));
        }

        let job = FetchJob::new(
            session_id.clone(),
            FetchRequest {
                url,
                format,
                resolution,
                output_path,
            },
        );
        if let Err(e) = self.runner.submit(job).await {
            self.mark_failed(&session_id, &e.to_string()).await;
            return Err(match e {
                JobError::PoolClosed => ServiceError::server("Service is shutting down"),
                other => ServiceError::server(other.to_string()),
            });
        }

        Ok(session_id)
    }

    /// Current snapshot of a session
    pub async fn progress(&self, session_id: &SessionId) -> ServiceResult<ProgressSnapshot> {
        self.store
            .get(session_id)
            .await
            .map(|record| record.snapshot())
            .map_err(|_| ServiceError::UnknownSession)
    }

    /// Resolve a finished artifact and start its retention window
    ///
    /// Expired artifacts are reclaimed first, so a session whose file was
    /// already deleted reports as unknown.
    pub async fn retrieve(
        &self,
        session_id: &SessionId,
        format: Option<MediaFormat>,
    ) -> ServiceResult<Artifact> {
        self.artifacts.cleanup().await;

        let record = self
            .store
            .get(session_id)
            .await
            .map_err(|_| ServiceError::UnknownSession)?;

        if record.status != SessionStatus::Downloaded {
            return Err(ServiceError::NotReady {
                status: record.status,
            });
        }

        let format = format.or(record.format).unwrap_or_default();
        let path = self
            .artifacts
            .locate(session_id, format)
            .await
            .ok_or(ServiceError::ArtifactMissing)?;

        self.artifacts
            .schedule_retention(session_id, path.clone())
            .await;

        Ok(Artifact {
            download_name: download_name(&record.title, format),
            path,
            format,
        })
    }

    pub async fn stats(&self) -> ServiceStats {
        ServiceStats {
            sessions: self.store.stats().await,
            jobs: self.runner.stats(),
            pending_deletions: self.artifacts.pending_deletions().await,
        }
    }

    /// Stop accepting jobs and wait for running ones
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), JobError> {
        self.runner.shutdown(timeout).await
    }

    async fn probe_url(&self, url: &str) -> ServiceResult<MediaInfo> {
        let probe = self.engine().probe(url);
        match tokio::time::timeout(self.probe.timeout, probe).await {
            Ok(result) => result.map_err(ServiceError::from),
            Err(_) => Err(EngineError::Timeout {
                seconds: self.probe.timeout.as_secs(),
            }
            .into()),
        }
    }

    async fn mark_failed(&self, session_id: &SessionId, message: &str) {
        let applied = self
            .store
            .update(session_id, |record| record.fail(message))
            .await;
        if let Some(Err(e)) = applied {
            warn!(session_id = %session_id, "Could not mark session failed: {}", e);
        }
    }
}

fn validate_url(raw: &str) -> ServiceResult<String> {
    if raw.trim().is_empty() {
        return Err(ServiceError::invalid_input("No URL provided"));
    }
    normalize_source_url(raw).map_err(ServiceError::from)
}
