use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use serde_json::json;
use thiserror::Error;

use crate::telemetry::ProviderError;

/// Everything a request can fail with. Each variant maps to one status code
/// and is rendered as `{"error": "<message>"}`.
#[derive(Error, Debug)]
pub enum PitWallError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("telemetry provider failure: {0}")]
    UpstreamFailure(String),
}

impl PitWallError {
    pub fn status(&self) -> StatusCode {
        match self {
            PitWallError::NotFound(_) => StatusCode::NOT_FOUND,
            PitWallError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PitWallError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<ProviderError> for PitWallError {
    fn from(e: ProviderError) -> Self {
        match e {
            ProviderError::SessionNotFound { .. } => PitWallError::NotFound(e.to_string()),
            other => PitWallError::UpstreamFailure(other.to_string()),
        }
    }
}

impl IntoResponse for PitWallError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            PitWallError::UpstreamFailure(msg) => tracing::warn!(%status, "{}", msg),
            other => tracing::debug!(%status, "{}", other),
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
