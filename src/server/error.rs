//! Mapping of service errors onto HTTP responses

use axum::extract::rejection::{FormRejection, JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::errors::ServiceError;

/// JSON error body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
    /// Present only when a session was created before the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Error returned by handlers
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        status_for(&self.0)
    }
}

/// HTTP status for each service error
pub fn status_for(error: &ServiceError) -> StatusCode {
    match error {
        ServiceError::InvalidInput { .. }
        | ServiceError::ResourceUnavailable { .. }
        | ServiceError::UnknownSession
        | ServiceError::NotReady { .. } => StatusCode::BAD_REQUEST,
        ServiceError::ArtifactMissing => StatusCode::NOT_FOUND,
        ServiceError::EngineFailure { .. } | ServiceError::ServerError { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        Self(error)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(ServiceError::invalid_input(rejection.body_text()))
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        Self(ServiceError::invalid_input(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(ServiceError::invalid_input(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            debug!("Request rejected ({}): {}", status, self.0);
        }

        let body = ErrorBody {
            error: self.0.public_message(),
            session_id: self.0.session_id().map(|id| id.to_string()),
        };
        (status, Json(body)).into_response()
    }
}
