//! Progress normalization
//!
//! Engines report raw, engine-specific [`EngineEvent`]s through a
//! [`ProgressReporter`]. Each job drains its own channel with a
//! [`ProgressNormalizer`] bound to the job's session id, turning events into
//! state machine transitions on the session record.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::app::session::{SessionId, SessionStore};
use crate::errors::SessionError;

/// Message recorded when the engine itself signals failure
pub const ENGINE_ERROR_MESSAGE: &str = "Download failed";

/// Raw event emitted by a fetching engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Transfer in progress; the payload is the engine's percent text
    Downloading { percent: Option<String> },
    /// The engine finished producing the artifact
    Finished,
    /// The engine reported a failure of its own
    Error { message: Option<String> },
    /// Media title became known
    Title(String),
    /// Any phase the normalizer does not act on
    Other { phase: String },
}

impl EngineEvent {
    /// Build an event from a phase name and its percent payload
    pub fn from_phase(phase: &str, percent: Option<&str>) -> Self {
        match phase.trim() {
            "downloading" => EngineEvent::Downloading {
                percent: percent.map(str::to_string),
            },
            "finished" => EngineEvent::Finished,
            "error" => EngineEvent::Error { message: None },
            other => EngineEvent::Other {
                phase: other.to_string(),
            },
        }
    }
}

/// Sending half handed to an engine for one job
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    session_id: SessionId,
    tx: mpsc::Sender<EngineEvent>,
}

impl ProgressReporter {
    /// Create a reporter/receiver pair for a session
    pub fn channel(
        session_id: SessionId,
        buffer: usize,
    ) -> (Self, mpsc::Receiver<EngineEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { session_id, tx }, rx)
    }

    /// Session this reporter writes to
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Deliver an event; a closed channel is logged and otherwise ignored
    pub async fn report(&self, event: EngineEvent) {
        if self.tx.send(event).await.is_err() {
            debug!(session_id = %self.session_id, "Progress channel closed, dropping event");
        }
    }
}

/// Applies engine events to one session record
#[derive(Debug, Clone)]
pub struct ProgressNormalizer {
    store: Arc<SessionStore>,
    session_id: SessionId,
}

impl ProgressNormalizer {
    pub fn new(store: Arc<SessionStore>, session_id: SessionId) -> Self {
        Self { store, session_id }
    }

    /// Apply a single event
    ///
    /// Returns `true` if the event moved the session to `Downloaded`.
    pub async fn apply(&self, event: EngineEvent) -> bool {
        let session_id = &self.session_id;
        let outcome = match event {
            EngineEvent::Downloading { percent } => {
                let value = parse_percentage(percent.as_deref());
                trace!(session_id = %session_id, percentage = value, "Progress update");
                self.store
                    .update(session_id, |record| record.record_progress(value).map(|_| false))
                    .await
            }
            EngineEvent::Finished => {
                self.store
                    .update(session_id, |record| record.complete().map(|_| true))
                    .await
            }
            EngineEvent::Error { message } => {
                let message = message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| ENGINE_ERROR_MESSAGE.to_string());
                warn!(session_id = %session_id, error = %message, "Engine reported an error");
                self.store
                    .update(session_id, |record| record.fail(message).map(|_| false))
                    .await
            }
            EngineEvent::Title(title) => {
                self.store
                    .update(session_id, |record| {
                        record.set_title_if_empty(&title);
                        Ok::<bool, SessionError>(false)
                    })
                    .await
            }
            EngineEvent::Other { phase } => {
                trace!(session_id = %session_id, phase = %phase, "Ignoring engine phase");
                return false;
            }
        };

        match outcome {
            Some(Ok(finished)) => finished,
            Some(Err(e)) => {
                debug!(session_id = %session_id, "Ignored engine event: {}", e);
                false
            }
            None => false,
        }
    }

    /// Drain the channel until every reporter is dropped
    ///
    /// Returns whether a `Finished` event was applied.
    pub async fn run(self, mut rx: mpsc::Receiver<EngineEvent>) -> bool {
        let mut finished = false;
        while let Some(event) = rx.recv().await {
            finished |= self.apply(event).await;
        }
        finished
    }
}

/// Parse an engine percent string such as `" 42.3%"`
///
/// ANSI colour sequences are stripped. Anything unparsable counts as 0.
pub fn parse_percentage(raw: Option<&str>) -> f64 {
    let Some(raw) = raw else {
        return 0.0;
    };
    let cleaned = strip_ansi(raw);
    let value = cleaned.trim().trim_end_matches('%').trim();
    match value.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => parsed.clamp(0.0, 100.0),
        _ => 0.0,
    }
}

fn strip_ansi(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            if chars.peek() == Some(&'[') {
                chars.next();
                // CSI sequence ends at the first byte in '@'..='~'
                for next in chars.by_ref() {
                    if ('@'..='~').contains(&next) {
                        break;
                    }
                }
            }
            continue;
        }
        out.push(c);
    }
    out
}
