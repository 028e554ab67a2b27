//! External fetching engine seam
//!
//! The actual retrieval and transcoding of media is delegated to an engine
//! behind the [`FetchEngine`] trait. The service only relies on three things:
//! a metadata probe, a fetch that writes the artifact to a given path, and
//! progress events delivered through a [`ProgressReporter`].
//!
//! # Module Organization
//!
//! - [`format`] - output formats, resolutions and selection rules
//! - [`url`] - source URL validation and canonicalisation
//! - [`config`] - engine settings
//! - [`ytdlp`] - subprocess adapter for `yt-dlp`
//! - [`simulated`] - scripted engine for demos and tests

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::app::progress::ProgressReporter;
use crate::errors::EngineResult;

pub mod config;
pub mod format;
pub mod simulated;
pub mod url;
pub mod ytdlp;

pub use config::EngineConfig;
pub use format::{FormatSelection, MediaFormat, PostProcess, Resolution};
pub use simulated::SimulatedEngine;
pub use url::normalize_source_url;
pub use ytdlp::YtDlpEngine;

/// Metadata returned by a probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub title: Option<String>,
    /// Length in whole seconds
    pub duration_secs: Option<u64>,
    pub thumbnail: Option<String>,
}

impl MediaInfo {
    /// Duration as `H:MM:SS`, hours not zero-padded
    pub fn duration_display(&self) -> String {
        let total = self.duration_secs.unwrap_or(0);
        format!("{}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
    }
}

/// Everything an engine needs to produce one artifact
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    /// Canonical source URL
    pub url: String,
    pub format: MediaFormat,
    pub resolution: Resolution,
    /// Where the final artifact must end up
    pub output_path: PathBuf,
}

impl FetchRequest {
    pub fn selection(&self) -> FormatSelection {
        FormatSelection::for_request(self.format, self.resolution)
    }
}

/// Result of a successful fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    /// Title reported by the engine, if any
    pub title: Option<String>,
}

/// Capability that retrieves media given a URL and format preferences
#[async_trait]
pub trait FetchEngine: Send + Sync + std::fmt::Debug {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Fetch metadata without downloading
    async fn probe(&self, url: &str) -> EngineResult<MediaInfo>;

    /// Produce the artifact at `request.output_path`, reporting progress
    async fn fetch(
        &self,
        request: &FetchRequest,
        progress: ProgressReporter,
    ) -> EngineResult<FetchOutcome>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_display() {
        let info = |secs| MediaInfo {
            title: None,
            duration_secs: secs,
            thumbnail: None,
        };
        assert_eq!(info(Some(212)).duration_display(), "0:03:32");
        assert_eq!(info(Some(3_725)).duration_display(), "1:02:05");
        assert_eq!(info(Some(36_000)).duration_display(), "10:00:00");
        assert_eq!(info(None).duration_display(), "0:00:00");
    }
}
