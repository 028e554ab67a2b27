//! Engine configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::engine;
use crate::errors::ConfigError;

/// Settings for the external fetching engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine executable, resolved through PATH when relative
    pub binary: PathBuf,
    /// Directory or binary path of ffmpeg, passed through to the engine
    pub ffmpeg_location: Option<PathBuf>,
    /// Netscape cookie file for authenticated sources
    pub cookies_file: Option<PathBuf>,
    /// Whether to probe metadata before accepting a download
    pub probe_before_download: bool,
    /// Time budget for a metadata probe
    #[serde(with = "humantime_serde")]
    pub probe_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from(engine::DEFAULT_BINARY),
            ffmpeg_location: None,
            cookies_file: None,
            probe_before_download: true,
            probe_timeout: engine::PROBE_TIMEOUT,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.binary.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "engine.binary".to_string(),
                value: String::new(),
                reason: "Engine binary cannot be empty".to_string(),
            });
        }
        if self.probe_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "engine.probe_timeout".to_string(),
                value: "0s".to_string(),
                reason: "Probe timeout must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Cookie file to hand to the engine, if one is configured and present
    pub fn usable_cookies_file(&self) -> Option<&PathBuf> {
        self.cookies_file.as_ref().filter(|path| path.is_file())
    }
}
