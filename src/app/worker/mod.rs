//! Job runner
//!
//! Launches one task per accepted fetch, bounded by a semaphore, and owns
//! each job's interaction with the engine until the session reaches a
//! terminal state.
//!
//! # Module Organization
//!
//! - [`config`] - Runner configuration with validation and presets
//! - [`types`] - Jobs, runner state and statistics snapshots
//! - [`stats`] - Shared job counters
//! - [`pool`] - The runner itself and the per-job task
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use media_fetcher::app::engine::{FetchRequest, MediaFormat, Resolution, SimulatedEngine};
//! use media_fetcher::app::session::{SessionId, SessionStore};
//! use media_fetcher::app::worker::{ConfigPresets, FetchJob, JobRunner};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(SessionStore::new());
//! let runner = JobRunner::new(
//!     ConfigPresets::production(),
//!     store.clone(),
//!     Arc::new(SimulatedEngine::new()),
//! );
//!
//! let id = SessionId::generate();
//! store.create(id.clone()).await?;
//! let request = FetchRequest {
//!     url: "https://example.com/clip".to_string(),
//!     format: MediaFormat::Mp4,
//!     resolution: Resolution::default(),
//!     output_path: format!("downloads/{}.mp4", id).into(),
//! };
//! runner.submit(FetchJob::new(id.clone(), request)).await?;
//!
//! println!("{:?}", store.get(&id).await?.snapshot());
//! runner.shutdown(Duration::from_secs(30)).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod pool;
pub mod stats;
pub mod types;

pub use config::{ConfigPresets, JobRunnerConfig, JobRunnerConfigBuilder};
pub use pool::{JobRunner, NO_OUTPUT_MESSAGE, SHUTDOWN_MESSAGE};
pub use stats::JobCounters;
pub use types::{FetchJob, JobOutcome, JobStats, RunnerState};
