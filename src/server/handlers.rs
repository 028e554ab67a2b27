//! Request handlers
//!
//! Thin translation between HTTP and [`FetchService`](crate::app::FetchService).

use axum::body::Body;
use axum::extract::rejection::{FormRejection, JsonRejection, QueryRejection};
use axum::extract::{Form, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use super::error::ApiError;
use super::AppState;
use crate::app::engine::MediaFormat;
use crate::app::service::{Artifact, DownloadRequest, ServiceStats, VideoInfo};
use crate::app::session::{ProgressSnapshot, SessionId};
use crate::errors::ServiceError;

/// Body of `POST /video_info`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VideoInfoRequest {
    pub url: String,
}

/// Query of `GET /progress` and `GET /download_file`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SessionQuery {
    pub session_id: Option<String>,
    pub format: Option<String>,
}

impl SessionQuery {
    fn session_id(&self) -> Result<SessionId, ServiceError> {
        self.session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(SessionId::from_raw)
            .ok_or(ServiceError::UnknownSession)
    }

    fn format(&self) -> Result<Option<MediaFormat>, ServiceError> {
        match self.format.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw.parse().map(Some),
        }
    }
}

/// Body of a successful `POST /download`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DownloadStarted {
    pub status: String,
    pub session_id: String,
}

/// Body of `GET /health`
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub stats: ServiceStats,
}

/// POST /video_info
pub async fn video_info(
    State(state): State<AppState>,
    payload: Result<Json<VideoInfoRequest>, JsonRejection>,
) -> Result<Json<VideoInfo>, ApiError> {
    let Json(request) = payload?;
    debug!("video_info request for {}", request.url);
    let info = state.service.video_info(&request.url).await?;
    Ok(Json(info))
}

/// POST /download
pub async fn start_download(
    State(state): State<AppState>,
    form: Result<Form<DownloadRequest>, FormRejection>,
) -> Result<Json<DownloadStarted>, ApiError> {
    let Form(request) = form?;
    debug!(
        "download request for {} (format={:?}, resolution={:?})",
        request.url, request.format, request.resolution
    );
    let session_id = state.service.start_download(request).await?;
    Ok(Json(DownloadStarted {
        status: "started".to_string(),
        session_id: session_id.to_string(),
    }))
}

/// GET /progress
pub async fn progress(
    State(state): State<AppState>,
    query: Result<Query<SessionQuery>, QueryRejection>,
) -> Result<Json<ProgressSnapshot>, ApiError> {
    let Query(query) = query?;
    let session_id = query.session_id()?;
    let snapshot = state.service.progress(&session_id).await?;
    Ok(Json(snapshot))
}

/// GET /download_file
pub async fn download_file(
    State(state): State<AppState>,
    query: Result<Query<SessionQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let session_id = query.session_id()?;
    let format = query.format()?;

    let artifact = state.service.retrieve(&session_id, format).await?;
    let response = file_response(&artifact).await?;
    info!(session_id = %session_id, "Serving {}", artifact.download_name);
    Ok(response)
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        stats: state.service.stats().await,
    })
}

async fn file_response(artifact: &Artifact) -> Result<Response, ServiceError> {
    let file = match File::open(&artifact.path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ServiceError::ArtifactMissing)
        }
        Err(e) => return Err(ServiceError::server(format!("Failed to open artifact: {}", e))),
    };
    let length = file
        .metadata()
        .await
        .map_err(|e| ServiceError::server(format!("Failed to read artifact metadata: {}", e)))?
        .len();

    let content_type = mime_guess::from_path(&artifact.path)
        .first_or_octet_stream()
        .to_string();
    let disposition = content_disposition(&artifact.download_name);

    let mut response = Body::from_stream(ReaderStream::new(file)).into_response();
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&content_type) {
        headers.insert(header::CONTENT_TYPE, value);
    }
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

/// `attachment` disposition with an ASCII fallback and an RFC 5987 UTF-8 name
pub fn content_disposition(name: &str) -> String {
    let fallback: String = name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if fallback == name {
        return format!("attachment; filename=\"{}\"", name);
    }

    let mut encoded = String::with_capacity(name.len() * 3);
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_ascii() {
        assert_eq!(
            content_disposition("My Clip.mp4"),
            "attachment; filename=\"My Clip.mp4\""
        );
    }

    #[test]
    fn test_content_disposition_utf8() {
        assert_eq!(
            content_disposition("Café.mp3"),
            "attachment; filename=\"Caf_.mp3\"; filename*=UTF-8''Caf%C3%A9.mp3"
        );
    }

    #[test]
    fn test_session_query_parsing() {
        let query = SessionQuery {
            session_id: Some("  ".to_string()),
            format: Some("mp3".to_string()),
        };
        assert!(matches!(query.session_id(), Err(ServiceError::UnknownSession)));
        assert_eq!(query.format().unwrap(), Some(MediaFormat::Mp3));

        let query = SessionQuery {
            session_id: Some("abc".to_string()),
            format: Some("wav".to_string()),
        };
        assert_eq!(query.session_id().unwrap().as_str(), "abc");
        assert!(query.format().is_err());
    }
}
