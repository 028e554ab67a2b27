//! Core application logic for Media Fetcher
//!
//! This module contains the session store, the progress normalizer, the
//! engine seam, the job runner, the artifact lifecycle and the service that
//! ties them together.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use media_fetcher::app::{DownloadRequest, FetchService, SessionStatus, SimulatedEngine};
//! use media_fetcher::config::AppConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! let service = FetchService::build(
//!     Arc::new(SimulatedEngine::new()),
//!     &config.engine,
//!     config.jobs.clone(),
//!     config.artifacts.clone(),
//! )
//! .await?;
//!
//! let id = service
//!     .start_download(DownloadRequest::new("https://example.com/clip").with_format("mp3"))
//!     .await?;
//!
//! while service.progress(&id).await?.status != SessionStatus::Downloaded {
//!     tokio::time::sleep(Duration::from_millis(250)).await;
//! }
//! let artifact = service.retrieve(&id, None).await?;
//! println!("Ready: {} at {}", artifact.download_name, artifact.path.display());
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod engine;
pub mod progress;
pub mod service;
pub mod session;
pub mod worker;

// Re-export main public API
pub use artifact::{ArtifactConfig, ArtifactManager, ArtifactReaper, CleanupReport};
pub use engine::{
    EngineConfig, FetchEngine, FetchOutcome, FetchRequest, MediaFormat, MediaInfo, Resolution,
    SimulatedEngine, YtDlpEngine,
};
pub use progress::{EngineEvent, ProgressNormalizer, ProgressReporter};
pub use service::{Artifact, DownloadRequest, FetchService, ServiceStats, VideoInfo};
pub use session::{ProgressSnapshot, SessionId, SessionRecord, SessionStats, SessionStatus, SessionStore};
pub use worker::{FetchJob, JobRunner, JobRunnerConfig, JobStats};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        // Ensure public API is accessible
        let config = JobRunnerConfig::default();
        assert!(config.max_concurrent > 0);
        assert_eq!(MediaFormat::default(), MediaFormat::Mp4);
    }
}
