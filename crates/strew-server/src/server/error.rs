//! Mapping from dispatch errors to HTTP responses.

use crate::server::telemetry::increment_request_errors;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use strew::Error;

/// Convenience alias for handler return types.
pub type ApiResult<T> = Result<T, ApiError>;

/// Wrapper carrying a dispatch error to the HTTP edge.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

/// JSON error body returned by every route.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    /// Batch index of the failing unit, for batch-level failures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        increment_request_errors();

        let (status, code, index) = match &self.0 {
            Error::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, "invalid_request", None),
            Error::UnknownModel { .. } => (StatusCode::NOT_FOUND, "unknown_model", None),
            Error::QueueFull { .. } => (StatusCode::TOO_MANY_REQUESTS, "queue_full", None),
            Error::Submission { .. } => (StatusCode::BAD_GATEWAY, "submission_failed", None),
            Error::Execution { .. } => (StatusCode::BAD_GATEWAY, "execution_failed", None),
            Error::DeadlineElapsed { .. } => {
                (StatusCode::GATEWAY_TIMEOUT, "deadline_elapsed", None)
            }
            Error::ServiceShutdown => (StatusCode::SERVICE_UNAVAILABLE, "service_shutdown", None),
            Error::ChannelError { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            Error::UnitFailed { index, source } => {
                // A unit that timed out keeps its timeout status at the edge.
                let status = match **source {
                    Error::DeadlineElapsed { .. } => StatusCode::GATEWAY_TIMEOUT,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, "unit_failed", Some(*index))
            }
        };

        let body = Json(ErrorBody {
            error: code.to_string(),
            message: self.0.to_string(),
            index,
        });
        (status, body).into_response()
    }
}
