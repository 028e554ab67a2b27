//! Configuration management for Media Fetcher
//!
//! Settings are layered: defaults, then a TOML file, then environment
//! variables (a `.env` file is honoured through `dotenv` in `main`), then
//! command line flags applied by the CLI layer.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::app::artifact::ArtifactConfig;
use crate::app::engine::EngineConfig;
use crate::app::worker::JobRunnerConfig;
use crate::constants::{config as config_file, engine, env, logging, server};
use crate::errors::ConfigError;

/// Unified application configuration for TOML serialization
///
/// Every section is defaulted, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Listen address
    pub server: ServerConfig,
    /// External fetching engine
    pub engine: EngineConfig,
    /// Job runner limits
    pub jobs: JobRunnerConfig,
    /// Artifact directory and retention
    pub artifacts: ArtifactConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP listen address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: server::DEFAULT_HOST.to_string(),
            port: server::DEFAULT_PORT,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when no CLI verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (explicit path, or the per-user default if present)
    /// 3. Environment variables
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file is not.
    pub async fn load(config_file_override: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path });
                }
                Self::load_from_file(&path).await?
            }
            None => match Self::default_config_path().filter(|path| path.exists()) {
                Some(path) => Self::load_from_file(&path).await?,
                None => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Per-user config file location
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| {
            dir.join(config_file::APP_DIR_NAME)
                .join(config_file::FILE_NAME)
        })
    }

    /// Load configuration from a TOML file
    pub async fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path).await?;
        let config = Self::from_toml(&content)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup; empty values are ignored
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(port) = get(env::PORT) {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: env::PORT.to_string(),
                value: port.clone(),
                reason: "Port must be a number between 0 and 65535".to_string(),
            })?;
        }
        if let Some(host) = get(env::HOST) {
            self.server.host = host.trim().to_string();
        }
        if let Some(dir) = get(env::DOWNLOAD_DIR) {
            self.artifacts.download_dir = PathBuf::from(dir);
        }
        if let Some(binary) = get(env::ENGINE_BINARY) {
            self.engine.binary = PathBuf::from(binary);
        }
        if let Some(ffmpeg) = get(env::FFMPEG_LOCATION) {
            self.engine.ffmpeg_location = Some(PathBuf::from(ffmpeg));
        }
        Ok(())
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "server.host".to_string(),
                value: self.server.host.clone(),
                reason: "Host cannot be empty".to_string(),
            });
        }
        self.engine.validate()?;
        self.jobs.validate()?;
        self.artifacts.validate()?;
        Ok(())
    }

    /// Materialise cookie material for the engine
    ///
    /// `COOKIES_DATA` wins and is written to the configured cookies file (or
    /// the default one). Otherwise an existing cookies file is used as is.
    /// Returns the file the engine should use, if any.
    pub async fn prepare_cookies(&mut self) -> Result<Option<PathBuf>, ConfigError> {
        let data = std::env::var(env::COOKIES_DATA).ok();
        self.prepare_cookies_from(data.as_deref()).await
    }

    pub async fn prepare_cookies_from(
        &mut self,
        data: Option<&str>,
    ) -> Result<Option<PathBuf>, ConfigError> {
        let path = self
            .engine
            .cookies_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(engine::DEFAULT_COOKIES_FILE));

        match data.filter(|d| !d.trim().is_empty()) {
            Some(data) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&path, data).await?;
                info!("Wrote cookies from {} to {}", env::COOKIES_DATA, path.display());
                self.engine.cookies_file = Some(path.clone());
                Ok(Some(path))
            }
            None if path.is_file() => {
                debug!("Using existing cookies file {}", path.display());
                self.engine.cookies_file = Some(path.clone());
                Ok(Some(path))
            }
            None => {
                warn!(
                    "No cookies available ({} unset, {} missing); restricted media may fail",
                    env::COOKIES_DATA,
                    path.display()
                );
                self.engine.cookies_file = None;
                Ok(None)
            }
        }
    }

    /// Default configuration rendered as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            value: String::new(),
            reason: e.to_string(),
        })
    }
}
