//! Integration tests for the HTTP surface
//!
//! These tests drive the router in-process against the simulated engine and
//! follow a session from acceptance through retrieval and reclamation.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, StatusCode};

use media_fetcher::app::{EngineConfig, MediaFormat, SessionId, YtDlpEngine};

use common::{app_with_engine, form, test_app, Windows};

/// Test the complete download flow
///
/// Start a job, poll it to completion, download the artifact and verify
/// the session is reclaimed once the retention window has passed.
#[tokio::test]
async fn test_download_poll_retrieve_and_reclaim() {
    let app = test_app(2, Windows::default()).await;

    let response = app
        .start_download(&form("https://example.com/video", "mp4", "480p"))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "started");
    let session_id = body["session_id"].as_str().unwrap().to_string();
    assert!(!session_id.is_empty());

    let early = app.progress(&session_id).await.json();
    assert_ne!(early["status"], "Error");
    let pct = early["percentage"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&pct));
    assert_eq!(early["error"], "");

    let done = app.wait_terminal(&session_id).await;
    assert_eq!(done["status"], "Downloaded");
    assert_eq!(done["percentage"].as_f64(), Some(100.0));
    assert!(!done["title"].as_str().unwrap().is_empty());

    let file = app
        .get(&format!("/download_file?session_id={}&format=mp4", session_id))
        .await;
    assert_eq!(file.status, StatusCode::OK);
    assert_eq!(file.headers[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(
        file.headers[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Simulated Clip.mp4\""
    );
    assert!(String::from_utf8_lossy(&file.body).starts_with("simulated mp4 artifact"));

    tokio::time::sleep(Duration::from_millis(200)).await;

    let again = app
        .get(&format!("/download_file?session_id={}&format=mp4", session_id))
        .await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.progress(&session_id).await.status, StatusCode::BAD_REQUEST);
}

/// Test input validation
///
/// An empty URL is rejected before any session exists.
#[tokio::test]
async fn test_empty_url_is_rejected_without_session() {
    let app = test_app(2, Windows::default()).await;

    let response = app.start_download(&form("", "mp4", "720p")).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body = response.json();
    assert!(!body["error"].as_str().unwrap().is_empty());
    assert!(body.get("session_id").is_none());
    assert!(app.service.store().is_empty().await);

    let response = app
        .start_download(&form("https://example.com/v", "flac", "720p"))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

/// Test unavailable media
///
/// The pre-flight probe rejects private media with a client error that
/// still names the session it created.
#[tokio::test]
async fn test_unavailable_media_returns_session_id() {
    let app = test_app(2, Windows::default()).await;

    let response = app
        .start_download(&form("https://example.com/private", "mp4", "720p"))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body = response.json();
    let session_id = body["session_id"].as_str().unwrap();

    let progress = app.progress(session_id).await.json();
    assert_eq!(progress["status"], "Error");
    assert!(!progress["error"].as_str().unwrap().is_empty());
}

/// Test unknown sessions
///
/// Missing and unknown ids are client errors on both read endpoints.
#[tokio::test]
async fn test_unknown_session_is_client_error() {
    let app = test_app(2, Windows::default()).await;

    for uri in [
        "/progress",
        "/progress?session_id=",
        "/progress?session_id=doesnotexist",
        "/download_file?session_id=doesnotexist&format=mp4",
    ] {
        let response = app.get(uri).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(response.json()["error"].is_string());
    }
}

/// Test retrieval before completion and after the file disappears
#[tokio::test]
async fn test_retrieval_errors() {
    let app = test_app(1, Windows::default()).await;

    let body = app
        .start_download(&form("https://example.com/video", "mp3", ""))
        .await
        .json();
    let session_id = body["session_id"].as_str().unwrap().to_string();

    let early = app
        .get(&format!("/download_file?session_id={}&format=mp3", session_id))
        .await;
    assert_eq!(early.status, StatusCode::BAD_REQUEST);
    assert!(early.json()["error"]
        .as_str()
        .unwrap()
        .contains("not complete"));

    assert_eq!(app.wait_terminal(&session_id).await["status"], "Downloaded");

    let path = app
        .service
        .artifacts()
        .output_path(&SessionId::from_raw(session_id.clone()), MediaFormat::Mp3);
    tokio::fs::remove_file(&path).await.unwrap();

    let missing = app
        .get(&format!("/download_file?session_id={}&format=mp3", session_id))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

/// Test failed jobs are observable only through polling
#[tokio::test]
async fn test_engine_failure_is_reported_by_progress() {
    let app = test_app(2, Windows::default()).await;

    let response = app
        .start_download(&form("https://example.com/fail", "mp4", "720p"))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let session_id = response.json()["session_id"].as_str().unwrap().to_string();

    let done = app.wait_terminal(&session_id).await;
    assert_eq!(done["status"], "Error");
    assert_eq!(done["error"], "Simulated network failure");

    let file = app
        .get(&format!("/download_file?session_id={}", session_id))
        .await;
    assert_eq!(file.status, StatusCode::BAD_REQUEST);
}

/// Test video info
#[tokio::test]
async fn test_video_info() {
    let app = test_app(1, Windows::default()).await;

    let response = app
        .video_info(r#"{"url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PL1"}"#)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["title"], "Simulated Clip");
    assert_eq!(body["duration"], "0:03:32");
    assert!(body["thumbnail"].is_string());

    let response = app.video_info(r#"{"url": ""}"#).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.video_info("not json").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(response.json()["error"].is_string());

    let response = app
        .video_info(r#"{"url": "https://example.com/private"}"#)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(app.service.store().is_empty().await);
}

/// Test health endpoint
#[tokio::test]
async fn test_health_reports_counters() {
    let app = test_app(1, Windows::default()).await;
    let session_id = app
        .start_download(&form("https://example.com/video", "mp4", "720p"))
        .await
        .json()["session_id"]
        .as_str()
        .unwrap()
        .to_string();
    app.wait_terminal(&session_id).await;

    let response = app.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["sessions"]["downloaded"], 1);
    assert_eq!(body["jobs"]["submitted"], 1);
}

/// Test CORS
#[tokio::test]
async fn test_cross_origin_requests_are_allowed() {
    let app = test_app(1, Windows::default()).await;
    let request = axum::http::Request::get("/health")
        .header(header::ORIGIN, "https://elsewhere.example")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

/// Test internal failures
///
/// Engine start-up failures surface as a fixed message; the binary path and
/// OS error stay in the log.
#[tokio::test]
async fn test_engine_failure_body_hides_details() {
    let engine_config = EngineConfig {
        binary: "/opt/secret/bin/yt-dlp-missing".into(),
        ..Default::default()
    };
    let engine = Arc::new(YtDlpEngine::new(engine_config.clone()));
    let app = app_with_engine(engine, &engine_config, 1, Windows::default()).await;

    let response = app
        .video_info(r#"{"url": "https://example.com/video"}"#)
        .await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json();
    assert_eq!(body["error"], "Failed to fetch video info");
    let raw = String::from_utf8_lossy(&response.body);
    assert!(!raw.contains("/opt/secret"));
    assert!(!raw.contains("os error"));
}
