//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;

use media_fetcher::app::{
    ArtifactConfig, EngineConfig, FetchEngine, FetchService, JobRunnerConfig, SimulatedEngine,
};
use media_fetcher::server::{router, AppState};

/// Windows short enough to observe within a test
pub struct Windows {
    pub retention_after_retrieval: Duration,
    pub unretrieved_retention: Duration,
}

impl Default for Windows {
    fn default() -> Self {
        Self {
            retention_after_retrieval: Duration::from_millis(100),
            unretrieved_retention: Duration::from_secs(3600),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub service: Arc<FetchService>,
    pub dir: TempDir,
}

pub async fn test_app(max_concurrent: usize, windows: Windows) -> TestApp {
    let engine = SimulatedEngine::new()
        .with_steps(4)
        .with_step_delay(Duration::from_millis(10));
    app_with_engine(Arc::new(engine), &EngineConfig::default(), max_concurrent, windows).await
}

/// Build an app around an arbitrary engine
pub async fn app_with_engine(
    engine: Arc<dyn FetchEngine>,
    engine_config: &EngineConfig,
    max_concurrent: usize,
    windows: Windows,
) -> TestApp {
    let dir = TempDir::new().unwrap();
    let jobs = JobRunnerConfig {
        max_concurrent,
        ..Default::default()
    };
    let artifacts = ArtifactConfig {
        download_dir: dir.path().join("downloads"),
        retention_after_retrieval: windows.retention_after_retrieval,
        unretrieved_retention: windows.unretrieved_retention,
        sweep_interval: Duration::from_millis(20),
    };
    let service = Arc::new(
        FetchService::build(engine, engine_config, jobs, artifacts)
            .await
            .unwrap(),
    );
    TestApp {
        router: router(AppState::new(service.clone())),
        service,
        dir,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn start_download(&self, form: &str) -> TestResponse {
        let request = Request::post("/download")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn video_info(&self, body: &str) -> TestResponse {
        let request = Request::post("/video_info")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn progress(&self, session_id: &str) -> TestResponse {
        self.get(&format!("/progress?session_id={}", session_id))
            .await
    }

    /// Poll until the session reaches a terminal status
    pub async fn wait_terminal(&self, session_id: &str) -> serde_json::Value {
        for _ in 0..500 {
            let response = self.progress(session_id).await;
            assert_eq!(response.status, StatusCode::OK);
            let body = response.json();
            if body["status"] == "Downloaded" || body["status"] == "Error" {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("session {} never finished", session_id);
    }
}

/// Form-encode a URL for the `url` field
pub fn form(url: &str, format: &str, resolution: &str) -> String {
    let encoded: String = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("url", url)
        .append_pair("format", format)
        .append_pair("resolution", resolution)
        .finish();
    encoded
}
