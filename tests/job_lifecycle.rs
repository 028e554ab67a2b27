//! Integration tests for job execution and artifact reclamation

mod common;

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_test::{assert_err, assert_ok};

use media_fetcher::app::{ArtifactReaper, DownloadRequest, MediaFormat, SessionId, SessionStatus};

use common::{test_app, Windows};

/// Test concurrent job isolation
///
/// Several jobs started together must each finish with their own artifact.
#[tokio::test]
async fn test_concurrent_jobs_do_not_interfere() {
    let app = test_app(2, Windows::default()).await;
    let service = app.service.clone();

    let mut ids = Vec::new();
    for i in 0..5 {
        let format = if i % 2 == 0 { "mp4" } else { "mp3" };
        let id = service
            .start_download(
                DownloadRequest::new(format!("https://example.com/clip{}", i)).with_format(format),
            )
            .await
            .unwrap();
        ids.push(id);
    }

    let unique: HashSet<&SessionId> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());

    let mut paths = HashSet::new();
    for id in &ids {
        let body = app.wait_terminal(id.as_str()).await;
        assert_eq!(body["status"], "Downloaded");

        let artifact = service.retrieve(id, None).await.unwrap();
        assert!(artifact.path.exists());
        let content = tokio::fs::read_to_string(&artifact.path).await.unwrap();
        assert!(content.contains(&format!("{} artifact", artifact.format)));
        paths.insert(artifact.path);
    }
    assert_eq!(paths.len(), ids.len());

    let stats = service.runner().stats();
    assert_eq!(stats.completed, 5);
    assert_eq!(stats.in_flight(), 0);
}

/// Test concurrency bound
///
/// With one slot, later jobs wait in `Initializing` until a permit frees.
#[tokio::test]
async fn test_jobs_beyond_limit_wait_their_turn() {
    let app = test_app(1, Windows::default()).await;
    let service = app.service.clone();

    let first = service
        .start_download(DownloadRequest::new("https://example.com/first"))
        .await
        .unwrap();
    let second = service
        .start_download(DownloadRequest::new("https://example.com/second"))
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(service.runner().stats().active <= 1);

    for id in [&first, &second] {
        assert_eq!(app.wait_terminal(id.as_str()).await["status"], "Downloaded");
    }
}

/// Test monotonic progress
///
/// Percentages observed by a poller never go backwards.
#[tokio::test]
async fn test_polled_percentage_is_monotonic() {
    let app = test_app(1, Windows::default()).await;
    let id = app
        .service
        .start_download(DownloadRequest::new("https://example.com/steady"))
        .await
        .unwrap();

    let mut last = 0.0;
    loop {
        let snapshot = app.service.progress(&id).await.unwrap();
        assert!(snapshot.percentage >= last, "{} < {}", snapshot.percentage, last);
        assert!(snapshot.percentage <= 100.0);
        last = snapshot.percentage;
        if snapshot.status.is_terminal() {
            assert_eq!(snapshot.status, SessionStatus::Downloaded);
            assert_eq!(snapshot.percentage, 100.0);
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

/// Test failure paths
///
/// Engine errors, panics and missing output all end in `Error` with a
/// message, and none of them leave a retrievable artifact.
#[tokio::test]
async fn test_failures_end_in_error() {
    let app = test_app(4, Windows::default()).await;

    for url in [
        "https://example.com/fail",
        "https://example.com/engine-error",
        "https://example.com/panic",
        "https://example.com/no-output",
    ] {
        let id = app
            .service
            .start_download(DownloadRequest::new(url))
            .await
            .unwrap();
        let body = app.wait_terminal(id.as_str()).await;
        assert_eq!(body["status"], "Error", "{}", url);
        assert!(!body["error"].as_str().unwrap().is_empty(), "{}", url);
        assert_err!(app.service.retrieve(&id, None).await);
    }

    let stats = app.service.runner().stats();
    assert_eq!(stats.failed, 4);
    assert_eq!(stats.completed, 0);
}

/// Test silent engines
///
/// A fetch that writes its file without any progress still completes.
#[tokio::test]
async fn test_silent_engine_still_completes() {
    let app = test_app(1, Windows::default()).await;
    let id = app
        .service
        .start_download(DownloadRequest::new("https://example.com/silent"))
        .await
        .unwrap();

    let body = app.wait_terminal(id.as_str()).await;
    assert_eq!(body["status"], "Downloaded");
    assert_eq!(body["percentage"].as_f64(), Some(100.0));
}

/// Test retention after retrieval
///
/// The first retrieval schedules deletion; the reaper removes the file and
/// forgets the session once the window passes.
#[tokio::test]
async fn test_retrieved_artifact_is_reclaimed_by_reaper() {
    let app = test_app(1, Windows::default()).await;
    let service = app.service.clone();
    let id = service
        .start_download(DownloadRequest::new("https://example.com/keep"))
        .await
        .unwrap();
    app.wait_terminal(id.as_str()).await;

    let artifact = service.retrieve(&id, None).await.unwrap();
    assert_eq!(service.artifacts().pending_deletions().await, 1);

    // A second retrieval inside the window is still served
    let again = service.retrieve(&id, None).await.unwrap();
    assert_eq!(again.path, artifact.path);

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let reaper = ArtifactReaper::start(service.artifacts().clone(), shutdown_rx);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!artifact.path.exists());
    assert!(!service.store().contains(&id).await);
    assert_eq!(service.artifacts().pending_deletions().await, 0);

    let _ = shutdown_tx.send(());
    reaper.join(Duration::from_secs(1)).await;
}

/// Test unretrieved retention
///
/// Completed artifacts nobody downloads are swept by age.
#[tokio::test]
async fn test_unretrieved_artifact_is_swept() {
    let app = test_app(
        1,
        Windows {
            retention_after_retrieval: Duration::from_secs(60),
            unretrieved_retention: Duration::from_millis(50),
        },
    )
    .await;
    let service = app.service.clone();
    let id = service
        .start_download(DownloadRequest::new("https://example.com/forgotten"))
        .await
        .unwrap();
    app.wait_terminal(id.as_str()).await;

    let path = app
        .service
        .artifacts()
        .locate(&id, MediaFormat::Mp4)
        .await
        .unwrap();

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let reaper = ArtifactReaper::start(service.artifacts().clone(), shutdown_rx);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!path.exists());
    assert!(!service.store().contains(&id).await);

    let _ = shutdown_tx.send(());
    reaper.join(Duration::from_secs(1)).await;
    assert_err!(app.service.progress(&id).await);
}

/// Test runner shutdown
///
/// After shutdown no new downloads are accepted.
#[tokio::test]
async fn test_shutdown_rejects_new_jobs() {
    let app = test_app(1, Windows::default()).await;
    assert_ok!(app.service.shutdown(Duration::from_secs(2)).await);

    let result = app
        .service
        .start_download(DownloadRequest::new("https://example.com/late"))
        .await;
    assert_err!(result);
}

/// Test rejected downloads do not accumulate
///
/// Sessions that failed before producing any file are evicted once the
/// unretrieved window passes.
#[tokio::test]
async fn test_rejected_sessions_are_evicted() {
    let app = test_app(
        2,
        Windows {
            retention_after_retrieval: Duration::from_secs(60),
            unretrieved_retention: Duration::from_millis(1),
        },
    )
    .await;

    for _ in 0..20 {
        assert_err!(
            app.service
                .start_download(DownloadRequest::new("https://example.com/private"))
                .await
        );
    }
    assert_eq!(app.service.store().len().await, 20);

    tokio::time::sleep(Duration::from_millis(20)).await;
    let report = app.service.artifacts().cleanup().await;

    assert_eq!(report.sessions_evicted, 20);
    assert!(app.service.store().is_empty().await);
}
