//! Artifact lifecycle configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::artifacts;
use crate::errors::ConfigError;

/// Where artifacts live and how long they are kept
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Shared output directory; files are named after their session
    pub download_dir: PathBuf,
    /// Deletion delay measured from the first successful retrieval
    #[serde(with = "humantime_serde")]
    pub retention_after_retrieval: Duration,
    /// Maximum age (by modification time) of a file that was never retrieved
    #[serde(with = "humantime_serde")]
    pub unretrieved_retention: Duration,
    /// Interval of the background reaper
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from(artifacts::DEFAULT_DOWNLOAD_DIR),
            retention_after_retrieval: artifacts::RETENTION_AFTER_RETRIEVAL,
            unretrieved_retention: artifacts::UNRETRIEVED_RETENTION,
            sweep_interval: artifacts::SWEEP_INTERVAL,
        }
    }
}

impl ArtifactConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("artifacts.retention_after_retrieval", self.retention_after_retrieval),
            ("artifacts.unretrieved_retention", self.unretrieved_retention),
            ("artifacts.sweep_interval", self.sweep_interval),
        ];
        for (field, value) in checks {
            if value.is_zero() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: "0s".to_string(),
                    reason: "Duration must be greater than zero".to_string(),
                });
            }
        }
        if self.download_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "artifacts.download_dir".to_string(),
                value: String::new(),
                reason: "Download directory cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}
