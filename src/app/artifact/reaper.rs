//! Background artifact reaper
//!
//! Periodically runs scheduled deletions and the age sweep until a
//! shutdown signal arrives on the broadcast channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::manager::ArtifactManager;

/// Handle to the running reaper task
#[derive(Debug)]
pub struct ArtifactReaper {
    task: JoinHandle<()>,
}

impl ArtifactReaper {
    /// Spawn the reaper using the manager's configured sweep interval
    pub fn start(manager: Arc<ArtifactManager>, shutdown_rx: broadcast::Receiver<()>) -> Self {
        let interval = manager.config().sweep_interval;
        Self::start_with_interval(manager, interval, shutdown_rx)
    }

    /// Spawn the reaper with an explicit tick interval
    pub fn start_with_interval(
        manager: Arc<ArtifactManager>,
        period: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        let task = tokio::spawn(async move {
            let mut cleanup_interval = tokio::time::interval(period);
            cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cleanup_interval.tick() => {
                        let report = manager.cleanup().await;
                        if report.files_deleted > 0 || report.sessions_evicted > 0 {
                            info!(
                                "Artifact reaper removed {} files, evicted {} sessions",
                                report.files_deleted, report.sessions_evicted
                            );
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Artifact reaper received shutdown signal");
                        break;
                    }
                }
            }
        });

        Self { task }
    }

    /// Wait for the task to stop after shutdown was signalled
    pub async fn join(self, timeout: Duration) {
        if tokio::time::timeout(timeout, self.task).await.is_err() {
            warn!("Artifact reaper shutdown timed out after {:?}", timeout);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;
    use tokio::fs;

    use super::*;
    use crate::app::artifact::ArtifactConfig;
    use crate::app::engine::MediaFormat;
    use crate::app::session::{SessionId, SessionStore};

    /// Test reaper deletes due artifacts
    ///
    /// Verifies that a scheduled deletion is carried out by the background
    /// task without any request arriving.
    #[tokio::test]
    async fn test_reaper_runs_due_deletions() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(SessionStore::new());
        let config = ArtifactConfig {
            download_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        let manager = Arc::new(ArtifactManager::new(config, store.clone()).await.unwrap());

        let id = SessionId::generate();
        store.create(id.clone()).await.unwrap();
        let path = manager.output_path(&id, MediaFormat::Mp4);
        fs::write(&path, b"data").await.unwrap();
        manager
            .schedule_deletion(&id, path.clone(), Duration::from_millis(5))
            .await;

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let reaper =
            ArtifactReaper::start_with_interval(manager.clone(), Duration::from_millis(10), shutdown_rx);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!path.exists());
        assert!(!store.contains(&id).await);

        shutdown_tx.send(()).unwrap();
        reaper.join(Duration::from_secs(1)).await;
    }

    /// Test reaper shutdown
    ///
    /// Verifies that the task exits promptly once shutdown is signalled.
    #[tokio::test]
    async fn test_reaper_stops_on_shutdown() {
        let temp_dir = TempDir::new().unwrap();
        let config = ArtifactConfig {
            download_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        let manager = Arc::new(
            ArtifactManager::new(config, Arc::new(SessionStore::new()))
                .await
                .unwrap(),
        );
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let reaper = ArtifactReaper::start(manager, shutdown_rx);

        shutdown_tx.send(()).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(reaper.is_finished());
    }
}
