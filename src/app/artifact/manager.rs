//! Artifact lifecycle manager
//!
//! Owns the shared download directory. Files are reclaimed two ways:
//! a deadline scheduled on first retrieval, and an age-based sweep for
//! files nobody ever retrieved. Both paths tolerate files and records that
//! a concurrent actor already removed.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::Utc;
use tokio::fs;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::config::ArtifactConfig;
use super::path::{artifact_path, session_id_from_path};
use crate::app::engine::MediaFormat;
use crate::app::session::{SessionId, SessionStore};
use crate::errors::{ArtifactError, ArtifactResult};

/// A pending deletion
#[derive(Debug, Clone)]
struct ScheduledDeletion {
    path: PathBuf,
    due_at: Instant,
}

/// Result of one cleanup pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Files removed from disk
    pub files_deleted: usize,
    /// Session records evicted from the store
    pub sessions_evicted: usize,
}

impl CleanupReport {
    fn merge(&mut self, other: CleanupReport) {
        self.files_deleted += other.files_deleted;
        self.sessions_evicted += other.sessions_evicted;
    }
}

/// Manages creation, lookup and timed deletion of artifacts
#[derive(Debug)]
pub struct ArtifactManager {
    config: ArtifactConfig,
    store: Arc<SessionStore>,
    scheduled: Mutex<HashMap<SessionId, ScheduledDeletion>>,
}

impl ArtifactManager {
    /// Create a manager, making sure the download directory exists
    pub async fn new(config: ArtifactConfig, store: Arc<SessionStore>) -> ArtifactResult<Self> {
        let root = &config.download_dir;
        if !root.exists() {
            fs::create_dir_all(root).await.map_err(|e| {
                error!("Failed to create download directory: {}", e);
                ArtifactError::DirectoryNotAccessible {
                    path: root.to_path_buf(),
                }
            })?;
            debug!("Created download directory: {}", root.display());
        }

        info!(
            "Initialized artifact manager with root: {}",
            root.display()
        );

        Ok(Self {
            config,
            store,
            scheduled: Mutex::new(HashMap::new()),
        })
    }

    pub fn config(&self) -> &ArtifactConfig {
        &self.config
    }

    pub fn download_dir(&self) -> &Path {
        &self.config.download_dir
    }

    /// Collision-free output path for a session
    pub fn output_path(&self, id: &SessionId, format: MediaFormat) -> PathBuf {
        artifact_path(&self.config.download_dir, id, format)
    }

    /// Remove any leftover file at `path` before a job writes there
    pub async fn prepare(&self, path: &Path) -> ArtifactResult<()> {
        if remove_if_exists(path).await? {
            warn!("Removed stale artifact before new job: {}", path.display());
        }
        Ok(())
    }

    /// Path of the artifact if it is on disk
    pub async fn locate(&self, id: &SessionId, format: MediaFormat) -> Option<PathBuf> {
        let path = self.output_path(id, format);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    /// Schedule deletion of a served artifact
    ///
    /// The window runs from the first retrieval; later retrievals never
    /// push an existing deadline back.
    pub async fn schedule_deletion(&self, id: &SessionId, path: PathBuf, delay: Duration) {
        let due_at = Instant::now() + delay;
        let mut scheduled = self.scheduled.lock().await;
        let entry = scheduled
            .entry(id.clone())
            .or_insert_with(|| ScheduledDeletion {
                path: path.clone(),
                due_at,
            });
        if entry.path != path {
            // a different format was served for the same session
            entry.path = path;
        }
        debug!(
            session_id = %id,
            "Artifact deletion scheduled in {:?}",
            entry.due_at.saturating_duration_since(Instant::now())
        );
    }

    /// Schedule deletion using the configured retention window
    pub async fn schedule_retention(&self, id: &SessionId, path: PathBuf) {
        self.schedule_deletion(id, path, self.config.retention_after_retrieval)
            .await;
    }

    /// Number of deletions waiting for their deadline
    pub async fn pending_deletions(&self) -> usize {
        self.scheduled.lock().await.len()
    }

    /// Delete every artifact whose deadline has passed and evict its session
    pub async fn run_due_deletions(&self) -> CleanupReport {
        let now = Instant::now();
        let due: Vec<(SessionId, ScheduledDeletion)> = {
            let mut scheduled = self.scheduled.lock().await;
            let ids: Vec<SessionId> = scheduled
                .iter()
                .filter(|(_, deletion)| deletion.due_at <= now)
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| scheduled.remove(&id).map(|deletion| (id, deletion)))
                .collect()
        };

        let mut report = CleanupReport::default();
        for (id, deletion) in due {
            report.merge(self.reclaim(&id, &deletion.path).await);
        }
        report
    }

    /// Delete artifacts older than the unretrieved retention window
    ///
    /// Only files named after a generated session id are considered. Files
    /// belonging to sessions that are still running are left alone.
    pub async fn sweep_expired(&self) -> ArtifactResult<CleanupReport> {
        let cutoff = SystemTime::now()
            .checked_sub(self.config.unretrieved_retention)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        let mut report = CleanupReport::default();

        let mut entries = match fs::read_dir(&self.config.download_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(report),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let meta = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta,
                _ => continue,
            };
            let modified = match meta.modified() {
                Ok(modified) => modified,
                Err(_) => continue,
            };
            if modified > cutoff {
                continue;
            }

            let Some(id) = session_id_from_path(&path) else {
                debug!("Leaving foreign file {}", path.display());
                continue;
            };
            if let Some(status) = self.store.status(&id).await {
                if !status.is_terminal() {
                    debug!(session_id = %id, "Skipping expired file of a running job");
                    continue;
                }
            }
            self.scheduled.lock().await.remove(&id);
            report.merge(self.reclaim(&id, &path).await);
        }

        if report.files_deleted > 0 {
            info!(
                "Swept {} expired artifacts, evicted {} sessions",
                report.files_deleted, report.sessions_evicted
            );
        }
        Ok(report)
    }

    /// Evict finished records untouched for the unretrieved retention window
    ///
    /// Covers sessions that never produced a file the sweep could find,
    /// such as rejected or failed jobs. Records with a pending scheduled
    /// deletion are left to that deadline.
    pub async fn evict_stale_records(&self) -> CleanupReport {
        let mut report = CleanupReport::default();
        let cutoff = match chrono::Duration::from_std(self.config.unretrieved_retention)
            .ok()
            .and_then(|window| Utc::now().checked_sub_signed(window))
        {
            Some(cutoff) => cutoff,
            None => return report,
        };

        for (id, artifact) in self.store.terminal_before(cutoff).await {
            if self.scheduled.lock().await.contains_key(&id) {
                continue;
            }
            match artifact {
                Some(path) => report.merge(self.reclaim(&id, &path).await),
                None => {
                    if self.store.remove(&id).await.is_some() {
                        debug!(session_id = %id, "Evicted stale session");
                        report.sessions_evicted += 1;
                    }
                }
            }
        }
        report
    }

    /// Run scheduled deletions, the age sweep and stale record eviction
    pub async fn cleanup(&self) -> CleanupReport {
        let mut report = self.run_due_deletions().await;
        match self.sweep_expired().await {
            Ok(swept) => report.merge(swept),
            Err(e) => warn!("Artifact sweep failed: {}", e),
        }
        report.merge(self.evict_stale_records().await);
        report
    }

    async fn reclaim(&self, id: &SessionId, path: &Path) -> CleanupReport {
        let mut report = CleanupReport::default();
        if self.delete_file(path).await {
            report.files_deleted += 1;
        }
        if self.store.remove(id).await.is_some() {
            report.sessions_evicted += 1;
        }
        info!(session_id = %id, "Reclaimed artifact {}", path.display());
        report
    }

    async fn delete_file(&self, path: &Path) -> bool {
        match remove_if_exists(path).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!("Failed to delete artifact {}: {}", path.display(), e);
                false
            }
        }
    }
}

/// Remove a file, treating "already gone" as success
async fn remove_if_exists(path: &Path) -> std::io::Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
