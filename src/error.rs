//! Gateway error taxonomy and its HTTP rendering.
//!
//! Every failure terminates the request. Callers see a status code and a short
//! `{"detail": ...}` body; upstream bodies and internal context stay in the logs.

use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("invalid API key")]
    Unauthorized,

    #[error("invalid model specified: {0}")]
    InvalidModel(String),

    #[error("prompt is required")]
    MissingPrompt,

    #[error("backend rejected task submission with status {status}")]
    UpstreamSubmit { status: u16 },

    #[error("backend status query failed with status {status}")]
    UpstreamPoll { status: u16 },

    #[error("backend response did not include a task id")]
    MissingTaskId,

    #[error("task ended with status {status}")]
    TaskFailed { status: String },

    #[error("task did not complete within {}s", .waited.as_secs())]
    Timeout { waited: Duration },

    #[error("backend request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed backend response: {0}")]
    MalformedResponse(String),
}

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::FORBIDDEN,
            Self::InvalidModel(_) | Self::MissingPrompt => StatusCode::BAD_REQUEST,
            Self::UpstreamSubmit { status } | Self::UpstreamPoll { status } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::MissingTaskId | Self::TaskFailed { .. } => StatusCode::BAD_GATEWAY,
            Self::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Network(_) | Self::MalformedResponse(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short, caller-facing description.
    pub fn detail(&self) -> String {
        match self {
            Self::Unauthorized => "Invalid API Key".to_string(),
            Self::InvalidModel(_) => "Invalid model specified".to_string(),
            Self::UpstreamSubmit { .. } => "Failed to start task".to_string(),
            Self::UpstreamPoll { .. } => "Error fetching task status".to_string(),
            other => other.to_string(),
        }
    }

    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::InvalidModel(_) => "invalid_model",
            Self::MissingPrompt => "missing_prompt",
            Self::UpstreamSubmit { .. } => "upstream_submit",
            Self::UpstreamPoll { .. } => "upstream_poll",
            Self::MissingTaskId => "missing_task_id",
            Self::TaskFailed { .. } => "task_failed",
            Self::Timeout { .. } => "timeout",
            Self::Network(_) => "network",
            Self::MalformedResponse(_) => "malformed_response",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            detail: self.detail(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_errors() {
        assert_eq!(GatewayError::Unauthorized.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(GatewayError::Unauthorized.detail(), "Invalid API Key");
        assert_eq!(
            GatewayError::InvalidModel("gpt".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            GatewayError::InvalidModel("gpt".into()).detail(),
            "Invalid model specified"
        );
    }

    #[test]
    fn test_upstream_status_passthrough() {
        let err = GatewayError::UpstreamPoll { status: 404 };
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.detail(), "Error fetching task status");

        let err = GatewayError::UpstreamSubmit { status: 503 };
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_out_of_range_upstream_status_is_bad_gateway() {
        let err = GatewayError::UpstreamSubmit { status: 1000 };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_timeout_detail() {
        let err = GatewayError::Timeout {
            waited: Duration::from_secs(90),
        };
        assert_eq!(err.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(err.detail(), "task did not complete within 90s");
        assert_eq!(err.kind(), "timeout");
    }
}
