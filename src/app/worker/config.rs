//! Job runner configuration
//!
//! Bounds on concurrent engine invocations and shutdown behaviour, with a
//! builder and presets for the common deployment shapes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::jobs;
use crate::errors::ConfigError;

/// Configuration for the job runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobRunnerConfig {
    /// Maximum number of engine invocations running at once
    pub max_concurrent: usize,
    /// Buffer size of each job's progress channel
    pub progress_buffer: usize,
    /// How long shutdown waits for in-flight jobs
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for JobRunnerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: jobs::DEFAULT_MAX_CONCURRENT,
            progress_buffer: jobs::PROGRESS_CHANNEL_SIZE,
            shutdown_timeout: jobs::SHUTDOWN_TIMEOUT,
        }
    }
}

impl JobRunnerConfig {
    /// Validate configuration values and return errors for invalid settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::InvalidValue {
                field: "jobs.max_concurrent".to_string(),
                value: "0".to_string(),
                reason: "Job concurrency cannot be zero".to_string(),
            });
        }

        if self.max_concurrent > jobs::MAX_CONCURRENT_LIMIT {
            return Err(ConfigError::InvalidValue {
                field: "jobs.max_concurrent".to_string(),
                value: self.max_concurrent.to_string(),
                reason: format!("Exceeds maximum ({})", jobs::MAX_CONCURRENT_LIMIT),
            });
        }

        if self.progress_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                field: "jobs.progress_buffer".to_string(),
                value: "0".to_string(),
                reason: "Progress buffer must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

/// Builder for JobRunnerConfig
#[derive(Debug, Default)]
pub struct JobRunnerConfigBuilder {
    config: JobRunnerConfig,
}

impl JobRunnerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_concurrent(mut self, count: usize) -> Self {
        self.config.max_concurrent = count;
        self
    }

    pub fn progress_buffer(mut self, size: usize) -> Self {
        self.config.progress_buffer = size;
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Build and validate
    pub fn build(self) -> Result<JobRunnerConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration presets for different deployment scenarios
pub struct ConfigPresets;

impl ConfigPresets {
    /// Conservative defaults for a shared host
    pub fn production() -> JobRunnerConfig {
        JobRunnerConfig::default()
    }

    /// Fast shutdown and small buffers for tests
    pub fn testing() -> JobRunnerConfig {
        JobRunnerConfig {
            max_concurrent: 2,
            progress_buffer: 8,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test JobRunnerConfig default values match constants
    #[test]
    fn test_job_runner_config_default() {
        let config = JobRunnerConfig::default();
        assert_eq!(config.max_concurrent, jobs::DEFAULT_MAX_CONCURRENT);
        assert_eq!(config.progress_buffer, jobs::PROGRESS_CHANNEL_SIZE);
        assert_eq!(config.shutdown_timeout, jobs::SHUTDOWN_TIMEOUT);
        assert!(config.validate().is_ok());
    }

    /// Test configuration validation catches invalid values
    ///
    /// Verifies that zero or excessive concurrency and an empty progress
    /// buffer are rejected.
    #[test]
    fn test_config_validation() {
        let config = JobRunnerConfig {
            max_concurrent: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = JobRunnerConfig {
            max_concurrent: jobs::MAX_CONCURRENT_LIMIT + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = JobRunnerConfig {
            progress_buffer: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        assert!(ConfigPresets::testing().validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = JobRunnerConfigBuilder::new()
            .max_concurrent(8)
            .shutdown_timeout(Duration::from_secs(1))
            .build()
            .unwrap();
        assert_eq!(config.max_concurrent, 8);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(1));

        assert!(JobRunnerConfigBuilder::new().max_concurrent(0).build().is_err());
    }

    #[test]
    fn test_deserializes_human_durations() {
        let config: JobRunnerConfig =
            toml::from_str("max_concurrent = 3\nshutdown_timeout = \"2m\"").unwrap();
        assert_eq!(config.max_concurrent, 3);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(120));
        assert_eq!(config.progress_buffer, jobs::PROGRESS_CHANNEL_SIZE);
    }
}
