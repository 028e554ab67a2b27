//! Scripted engine used for demos and tests
//!
//! Produces a small placeholder artifact after emitting a configurable
//! sequence of progress events. Behaviour is selected by keywords in the
//! source URL so that every path of the job state machine can be driven
//! without network access:
//!
//! | URL contains  | behaviour                                          |
//! |---------------|----------------------------------------------------|
//! | `private`     | probe and fetch report the media as unavailable    |
//! | `engine-error`| emits an engine error event, then fails            |
//! | `fail`        | progresses halfway, then fails                     |
//! | `silent`      | writes the artifact without emitting any event     |
//! | `no-output`   | reports success without writing anything           |
//! | `panic`       | panics inside the fetch                            |

use std::time::Duration;

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::{FetchEngine, FetchOutcome, FetchRequest, MediaInfo};
use crate::app::progress::{EngineEvent, ProgressReporter};
use crate::errors::{EngineError, EngineResult};

const DEFAULT_STEPS: u32 = 5;
const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(200);
const SIMULATED_DURATION_SECS: u64 = 212;

/// Engine that simulates a fetch without touching the network
#[derive(Debug, Clone)]
pub struct SimulatedEngine {
    steps: u32,
    step_delay: Duration,
    title: String,
}

impl Default for SimulatedEngine {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS,
            step_delay: DEFAULT_STEP_DELAY,
            title: "Simulated Clip".to_string(),
        }
    }
}

impl SimulatedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of progress events emitted before finishing
    pub fn with_steps(mut self, steps: u32) -> Self {
        self.steps = steps.max(1);
        self
    }

    /// Delay between progress events
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// Title reported for every fetch
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    async fn emit_progress(&self, progress: &ProgressReporter, upto_step: u32) {
        for step in 1..=upto_step {
            tokio::time::sleep(self.step_delay).await;
            let pct = f64::from(step) * 100.0 / f64::from(self.steps);
            progress
                .report(EngineEvent::Downloading {
                    percent: Some(format!("{:5.1}%", pct)),
                })
                .await;
        }
    }
}

#[async_trait]
impl FetchEngine for SimulatedEngine {
    fn name(&self) -> &'static str {
        "simulated"
    }

    async fn probe(&self, url: &str) -> EngineResult<MediaInfo> {
        if url.contains("private") {
            return Err(EngineError::Unavailable {
                reason: "Private video".to_string(),
            });
        }
        Ok(MediaInfo {
            title: Some(self.title.clone()),
            duration_secs: Some(SIMULATED_DURATION_SECS),
            thumbnail: Some("https://example.invalid/thumbnail.jpg".to_string()),
        })
    }

    async fn fetch(
        &self,
        request: &FetchRequest,
        progress: ProgressReporter,
    ) -> EngineResult<FetchOutcome> {
        let url = request.url.as_str();
        debug!(session_id = %progress.session_id(), "Simulating fetch of {}", url);

        if url.contains("private") {
            return Err(EngineError::Failed {
                message: "Private video".to_string(),
            });
        }
        if url.contains("panic") {
            panic!("simulated engine panic");
        }
        if url.contains("engine-error") {
            self.emit_progress(&progress, 1).await;
            progress.report(EngineEvent::Error { message: None }).await;
            return Err(EngineError::Failed {
                message: "Simulated engine error".to_string(),
            });
        }
        if url.contains("fail") {
            self.emit_progress(&progress, (self.steps / 2).max(1)).await;
            return Err(EngineError::Failed {
                message: "Simulated network failure".to_string(),
            });
        }
        if url.contains("no-output") {
            return Ok(FetchOutcome::default());
        }

        let silent = url.contains("silent");
        if !silent {
            progress.report(EngineEvent::Title(self.title.clone())).await;
            self.emit_progress(&progress, self.steps).await;
        }

        if let Some(parent) = request.output_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let body = format!(
            "simulated {} artifact for {} at {}\n",
            request.format, request.url, request.resolution
        );
        fs::write(&request.output_path, body).await?;

        if !silent {
            progress.report(EngineEvent::Finished).await;
        }
        Ok(FetchOutcome {
            title: Some(self.title.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::app::engine::{MediaFormat, Resolution};
    use crate::app::session::SessionId;

    fn request(dir: &TempDir, url: &str) -> FetchRequest {
        FetchRequest {
            url: url.to_string(),
            format: MediaFormat::Mp4,
            resolution: Resolution::default(),
            output_path: dir.path().join("out.mp4"),
        }
    }

    #[tokio::test]
    async fn test_successful_fetch_writes_artifact_and_reports() {
        let dir = TempDir::new().unwrap();
        let engine = SimulatedEngine::new()
            .with_steps(3)
            .with_step_delay(Duration::from_millis(1));
        let (reporter, mut rx) = ProgressReporter::channel(SessionId::generate(), 16);

        let outcome = engine
            .fetch(&request(&dir, "https://example.com/v"), reporter)
            .await
            .unwrap();

        assert_eq!(outcome.title.as_deref(), Some("Simulated Clip"));
        assert!(dir.path().join("out.mp4").is_file());

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events.first(), Some(&EngineEvent::Title("Simulated Clip".to_string())));
        assert_eq!(events.last(), Some(&EngineEvent::Finished));
        assert_eq!(events.len(), 5);
    }

    #[tokio::test]
    async fn test_private_media_is_unavailable() {
        let engine = SimulatedEngine::new();
        let err = engine.probe("https://example.com/private").await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
