//! Concurrent session record store
//!
//! One map guarded by an async `RwLock`. Every mutation is a short critical
//! section and readers only ever receive clones, so a poller can never see
//! a record halfway through an update.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use super::types::{SessionId, SessionRecord, SessionStatus};
use crate::errors::{SessionError, SessionResult};

/// Counts of records per status
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct SessionStats {
    pub initializing: usize,
    pub downloading: usize,
    pub downloaded: usize,
    pub error: usize,
}

impl SessionStats {
    /// Total number of tracked records
    pub fn total(&self) -> usize {
        self.initializing + self.downloading + self.downloaded + self.error
    }
}

/// Store of session records keyed by id
#[derive(Debug, Default)]
pub struct SessionStore {
    records: RwLock<HashMap<SessionId, SessionRecord>>,
}

impl SessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fresh `Initializing` record
    pub async fn create(&self, id: SessionId) -> SessionResult<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&id) {
            return Err(SessionError::DuplicateSession { id });
        }
        debug!(session_id = %id, "Created session record");
        records.insert(id.clone(), SessionRecord::new(id));
        Ok(())
    }

    /// Consistent copy of a record
    pub async fn get(&self, id: &SessionId) -> SessionResult<SessionRecord> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound { id: id.clone() })
    }

    /// Atomic read-modify-write
    ///
    /// A missing record is logged and reported as `None`: the job may have
    /// raced with cleanup, which is not an error for the caller.
    pub async fn update<F, T>(&self, id: &SessionId, mutator: F) -> Option<T>
    where
        F: FnOnce(&mut SessionRecord) -> T,
    {
        let mut records = self.records.write().await;
        match records.get_mut(id) {
            Some(record) => Some(mutator(record)),
            None => {
                debug!(session_id = %id, "Update skipped, session no longer exists");
                None
            }
        }
    }

    /// Evict a record; removing an unknown id is a no-op
    pub async fn remove(&self, id: &SessionId) -> Option<SessionRecord> {
        let removed = self.records.write().await.remove(id);
        if removed.is_some() {
            debug!(session_id = %id, "Evicted session record");
        }
        removed
    }

    /// Whether a record exists
    pub async fn contains(&self, id: &SessionId) -> bool {
        self.records.read().await.contains_key(id)
    }

    /// Current status of a record
    pub async fn status(&self, id: &SessionId) -> Option<SessionStatus> {
        self.records.read().await.get(id).map(|record| record.status)
    }

    /// Number of tracked records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether no records are tracked
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// All tracked ids
    pub async fn ids(&self) -> Vec<SessionId> {
        self.records.read().await.keys().cloned().collect()
    }

    /// Terminal records last touched before `cutoff`, with their output paths
    pub async fn terminal_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Vec<(SessionId, Option<PathBuf>)> {
        self.records
            .read()
            .await
            .values()
            .filter(|record| record.status.is_terminal() && record.updated_at < cutoff)
            .map(|record| (record.id.clone(), record.artifact_path.clone()))
            .collect()
    }

    /// Per-status counts
    pub async fn stats(&self) -> SessionStats {
        let records = self.records.read().await;
        let mut stats = SessionStats::default();
        for record in records.values() {
            match record.status {
                SessionStatus::Initializing => stats.initializing += 1,
                SessionStatus::Downloading => stats.downloading += 1,
                SessionStatus::Downloaded => stats.downloaded += 1,
                SessionStatus::Error => stats.error += 1,
            }
        }
        stats
    }
}
