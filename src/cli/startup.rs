//! Startup checks for Media Fetcher
//!
//! Resolves the fetching engine, prepares cookie material and reports what
//! the service is about to run with.

use std::sync::Arc;

use tracing::{info, warn};

use crate::app::engine::{FetchEngine, SimulatedEngine, YtDlpEngine};
use crate::config::AppConfig;
use crate::errors::Result;

/// Results of startup checks
#[derive(Debug, Clone, Default)]
pub struct StartupStatus {
    /// Engine name used for jobs
    pub engine: String,
    /// Version reported by the engine binary, if it could be queried
    pub engine_version: Option<String>,
    /// Whether cookie material is available to the engine
    pub cookies_configured: bool,
}

impl StartupStatus {
    /// Whether jobs can reasonably be expected to succeed
    pub fn is_ready(&self) -> bool {
        self.engine == "simulated" || self.engine_version.is_some()
    }

    /// One-line summary for the log
    pub fn summary(&self) -> String {
        let version = self.engine_version.as_deref().unwrap_or("unavailable");
        let cookies = if self.cookies_configured {
            "cookies configured"
        } else {
            "no cookies"
        };
        format!("engine {} ({}), {}", self.engine, version, cookies)
    }
}

/// Build the engine described by the configuration
///
/// With `simulate` set the built-in simulated engine is used and no
/// external binary or cookie file is touched.
pub async fn build_engine(
    config: &mut AppConfig,
    simulate: bool,
) -> Result<(Arc<dyn FetchEngine>, StartupStatus)> {
    if simulate {
        info!("Using simulated engine");
        let status = StartupStatus {
            engine: "simulated".to_string(),
            ..Default::default()
        };
        return Ok((Arc::new(SimulatedEngine::new()), status));
    }

    let cookies = config.prepare_cookies().await?;
    let engine = YtDlpEngine::new(config.engine.clone());

    let engine_version = match engine.version().await {
        Ok(version) => Some(version),
        Err(e) => {
            warn!("Fetching engine is not usable: {}", e);
            None
        }
    };

    let status = StartupStatus {
        engine: engine.name().to_string(),
        engine_version,
        cookies_configured: cookies.is_some(),
    };
    Ok((Arc::new(engine), status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_engine_is_always_ready() {
        let mut config = AppConfig::default();
        let (engine, status) = build_engine(&mut config, true).await.unwrap();
        assert_eq!(engine.name(), "simulated");
        assert!(status.is_ready());
    }

    #[test]
    fn test_summary_reports_missing_engine() {
        let status = StartupStatus {
            engine: "yt-dlp".to_string(),
            engine_version: None,
            cookies_configured: false,
        };
        assert!(!status.is_ready());
        assert_eq!(status.summary(), "engine yt-dlp (unavailable), no cookies");
    }
}
