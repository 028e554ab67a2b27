//! Error types for Media Fetcher
//!
//! This module defines the error types for every component of the service.
//! Component errors stay close to the failure they describe; [`ServiceError`]
//! is the caller-facing taxonomy that the HTTP layer maps onto status codes.

use std::path::PathBuf;

use thiserror::Error;

use crate::app::session::{SessionId, SessionStatus};

/// Session record store errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// A record already exists for this id
    #[error("Session already exists: {id}")]
    DuplicateSession { id: SessionId },

    /// No record exists for this id
    #[error("Unknown session: {id}")]
    NotFound { id: SessionId },

    /// The requested status change is not part of the state machine
    #[error("Invalid session transition from {from} to {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },
}

/// External fetching engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// URL failed validation before reaching the engine
    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The resource is private, restricted, removed or otherwise not fetchable
    #[error("Media unavailable: {reason}")]
    Unavailable { reason: String },

    /// The engine ran and reported a failure
    #[error("{message}")]
    Failed { message: String },

    /// The engine process could not be started
    #[error("Failed to start fetching engine '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The engine did not answer within its time budget
    #[error("Fetching engine timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// The engine claimed success but left nothing at the output path
    #[error("Engine produced no output at {path}")]
    NoOutput { path: PathBuf },

    /// I/O error talking to the engine
    #[error("Engine I/O error")]
    Io(#[from] std::io::Error),

    /// Engine metadata could not be decoded
    #[error("Failed to decode engine metadata")]
    Json(#[from] serde_json::Error),
}

impl EngineError {
    /// Whether the error means the caller asked for something that cannot be served
    pub fn is_unavailable(&self) -> bool {
        matches!(self, EngineError::Unavailable { .. })
    }
}

/// Artifact lifecycle errors
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// Download directory could not be created or read
    #[error("Download directory not accessible: {path}")]
    DirectoryNotAccessible { path: PathBuf },

    /// The artifact is not on disk
    #[error("File not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O failure while managing artifacts
    #[error("Artifact I/O error")]
    Io(#[from] std::io::Error),
}

/// Job runner errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// The runner no longer accepts work
    #[error("Job runner is shut down")]
    PoolClosed,

    /// The job task panicked
    #[error("Job task panicked: {message}")]
    Panicked { message: String },

    /// Shutdown did not complete within the timeout
    #[error("Job runner shutdown timed out after {seconds} seconds with {pending} jobs running")]
    ShutdownTimeout { seconds: u64, pending: usize },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Configuration file could not be read or written
    #[error("Configuration I/O error")]
    Io(#[from] std::io::Error),
}

/// Caller-facing errors produced by the fetch service
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Missing or malformed input, rejected before any job side effects
    #[error("{message}")]
    InvalidInput { message: String },

    /// The pre-flight probe rejected the resource
    #[error("{message}")]
    ResourceUnavailable {
        message: String,
        session_id: Option<SessionId>,
    },

    /// The engine failed while serving a synchronous request
    #[error("{message}")]
    EngineFailure { message: String },

    /// Polling or retrieving a session that does not exist (or expired)
    #[error("Invalid or missing session ID")]
    UnknownSession,

    /// Retrieval before the job finished
    #[error("Download not complete (status: {status})")]
    NotReady { status: SessionStatus },

    /// The session finished but its file is gone
    #[error("File not found")]
    ArtifactMissing,

    /// Unexpected internal failure; details are logged, not returned
    #[error("{message}")]
    ServerError { message: String },
}

impl ServiceError {
    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a generic server error
    pub fn server(message: impl Into<String>) -> Self {
        Self::ServerError {
            message: message.into(),
        }
    }

    /// Session id created before the failure, if any
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            ServiceError::ResourceUnavailable { session_id, .. } => session_id.as_ref(),
            _ => None,
        }
    }

    /// Message safe to return to callers
    ///
    /// Internal failures collapse to a fixed message; the full error is
    /// only logged.
    pub fn public_message(&self) -> String {
        match self {
            ServiceError::EngineFailure { .. } => "Failed to fetch video info".to_string(),
            ServiceError::ServerError { .. } => "Server error".to_string(),
            other => other.to_string(),
        }
    }

    /// Whether the failure was caused by the caller
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            ServiceError::EngineFailure { .. } | ServiceError::ServerError { .. }
        )
    }
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Session store error
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Engine error
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Artifact error
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    /// Job runner error
    #[error(transparent)]
    Job(#[from] JobError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Service error
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Session(_) => "session",
            AppError::Engine(_) => "engine",
            AppError::Artifact(_) => "artifact",
            AppError::Job(_) => "job",
            AppError::Config(_) => "config",
            AppError::Service(_) => "service",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Session result type alias
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Engine result type alias
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Artifact result type alias
pub type ArtifactResult<T> = std::result::Result<T, ArtifactError>;

/// Service result type alias
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

impl From<EngineError> for ServiceError {
    fn from(error: EngineError) -> Self {
        match error {
            EngineError::InvalidUrl { url, reason } => ServiceError::InvalidInput {
                message: format!("Invalid URL '{}': {}", url, reason),
            },
            EngineError::Unavailable { reason } => ServiceError::ResourceUnavailable {
                message: reason,
                session_id: None,
            },
            other => ServiceError::EngineFailure {
                message: other.to_string(),
            },
        }
    }
}
