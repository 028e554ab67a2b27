//! Session record types and the job state machine

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::engine::MediaFormat;
use crate::errors::{SessionError, SessionResult};

/// Opaque handle identifying one accepted job
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a fresh, never reused identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wrap an identifier received from a caller
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Accept only identifiers in the form `generate` produces
    ///
    /// That is a simple-format UUID: 32 lowercase hex digits.
    pub fn parse_generated(raw: &str) -> Option<Self> {
        let uuid = Uuid::try_parse(raw).ok()?;
        let canonical = uuid.simple().to_string();
        (canonical == raw).then(|| Self(canonical))
    }

    /// Borrow the identifier as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a job
///
/// `Initializing → Downloading → Downloaded`, with `Error` reachable from
/// both non-terminal states. `Initializing → Downloaded` covers engines that
/// finish without ever emitting progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionStatus {
    Initializing,
    Downloading,
    Downloaded,
    Error,
}

impl SessionStatus {
    /// Whether the job can no longer change
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Downloaded | SessionStatus::Error)
    }

    /// Transition table
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, next),
            (Initializing, Downloading)
                | (Initializing, Downloaded)
                | (Initializing, Error)
                | (Downloading, Downloading)
                | (Downloading, Downloaded)
                | (Downloading, Error)
        )
    }

    /// Status name as reported to pollers
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Initializing => "Initializing",
            SessionStatus::Downloading => "Downloading",
            SessionStatus::Downloaded => "Downloaded",
            SessionStatus::Error => "Error",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable progress/status record for one job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionRecord {
    pub id: SessionId,
    pub status: SessionStatus,
    /// Progress in [0, 100]
    pub percentage: f64,
    /// Empty until metadata is known
    pub title: String,
    /// Set once, on the transition to `Error`
    pub error: Option<String>,
    /// Requested output format
    pub format: Option<MediaFormat>,
    /// Output location, assigned once the job is accepted
    pub artifact_path: Option<std::path::PathBuf>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Fresh record in `Initializing` state
    pub fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: SessionStatus::Initializing,
            percentage: 0.0,
            title: String::new(),
            error: None,
            format: None,
            artifact_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `next` if the state machine allows it
    pub fn transition(&mut self, next: SessionStatus) -> SessionResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(SessionError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.touch();
        Ok(())
    }

    /// Apply a progress reading
    ///
    /// Moves the record to `Downloading` and never lets the percentage go
    /// backwards.
    pub fn record_progress(&mut self, percentage: f64) -> SessionResult<()> {
        self.transition(SessionStatus::Downloading)?;
        let clamped = clamp_percentage(percentage);
        if clamped > self.percentage {
            self.percentage = clamped;
        }
        Ok(())
    }

    /// Mark the job finished
    pub fn complete(&mut self) -> SessionResult<()> {
        self.transition(SessionStatus::Downloaded)?;
        self.percentage = 100.0;
        Ok(())
    }

    /// Mark the job failed with a message
    pub fn fail(&mut self, message: impl Into<String>) -> SessionResult<()> {
        self.transition(SessionStatus::Error)?;
        self.error = Some(message.into());
        Ok(())
    }

    /// Set the title unless one is already known
    pub fn set_title_if_empty(&mut self, title: &str) {
        let title = title.trim();
        if self.title.is_empty() && !title.is_empty() {
            self.title = title.to_string();
            self.touch();
        }
    }

    /// Point-in-time view returned to pollers
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            percentage: self.percentage,
            status: self.status,
            error: self.error.clone().unwrap_or_default(),
            title: self.title.clone(),
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Wire shape of `GET /progress`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub percentage: f64,
    pub status: SessionStatus,
    pub error: String,
    pub title: String,
}

fn clamp_percentage(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}
