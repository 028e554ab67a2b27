//! Prelude module for Media Fetcher Library
//!
//! This module re-exports the most commonly used items from the library,
//! providing a convenient way to import everything needed for typical usage
//! with a single `use media_fetcher::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use media_fetcher::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::default();
//!     let service = FetchService::build(
//!         Arc::new(SimulatedEngine::new()),
//!         &config.engine,
//!         config.jobs.clone(),
//!         config.artifacts.clone(),
//!     )
//!     .await?;
//!
//!     let id = service
//!         .start_download(DownloadRequest::new("https://example.com/clip"))
//!         .await?;
//!     println!("{:?}", service.progress(&id).await?);
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result, ServiceError, ServiceResult};

// Configuration
pub use crate::config::AppConfig;

// Orchestration
pub use crate::app::{
    ArtifactConfig, ArtifactManager, ArtifactReaper, DownloadRequest, FetchService, JobRunner,
    JobRunnerConfig, VideoInfo,
};

// Sessions and progress
pub use crate::app::{
    EngineEvent, ProgressNormalizer, ProgressReporter, ProgressSnapshot, SessionId, SessionRecord,
    SessionStatus, SessionStore,
};

// Engines
pub use crate::app::{
    FetchEngine, FetchRequest, MediaFormat, MediaInfo, Resolution, SimulatedEngine, YtDlpEngine,
};

// HTTP surface
pub use crate::server::{router, AppState};
