//! API error types and their JSON responses.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use binwatch_core::{GrantError, PlanningError, PortError};

const INTERNAL_MESSAGE: &str = "An internal error occurred";
const INTERNAL_PLANNING_MESSAGE: &str = "An internal error occurred while planning the route";

/// Errors returned by HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Malformed or invalid request.
    #[error("{0}")]
    BadRequest(String),
    /// Resource not found.
    #[error("{0}")]
    NotFound(String),
    /// An upstream service failed.
    #[error("{0}")]
    BadGateway(String),
    /// A feature is not configured on this server.
    #[error("{0}")]
    Unavailable(String),
    /// Internal error. The message is safe to show to clients.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Failure body shared by every endpoint.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Always `false`.
    pub success: bool,
    /// Human-readable message.
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            success: false,
            message: self.to_string(),
        };

        tracing::warn!(status = status.as_u16(), message = %body.message, "Request failed");

        (status, Json(body)).into_response()
    }
}

impl From<PlanningError> for ApiError {
    fn from(err: PlanningError) -> Self {
        match err {
            PlanningError::NoValidBins => Self::NotFound(err.to_string()),
            PlanningError::RouteComputationFailed { .. } => Self::BadRequest(err.to_string()),
            // Detail was logged by the planner.
            PlanningError::Internal(_) => Self::Internal(INTERNAL_PLANNING_MESSAGE.to_owned()),
        }
    }
}

impl From<PortError> for ApiError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::BinNotFound(_) => Self::NotFound(err.to_string()),
            PortError::InvalidReading(_) => Self::BadRequest(err.to_string()),
            other => {
                tracing::error!(error = %other, "Backend failure");
                Self::Internal(INTERNAL_MESSAGE.to_owned())
            }
        }
    }
}

impl From<GrantError> for ApiError {
    fn from(err: GrantError) -> Self {
        match err {
            GrantError::EmptyUserId | GrantError::InvalidTtl(_) => Self::BadRequest(err.to_string()),
            GrantError::NotConfigured => Self::Unavailable(err.to_string()),
            GrantError::Backend(inner) => {
                tracing::error!(error = %inner, "Realtime grant failed");
                Self::BadGateway("Could not issue realtime token".to_owned())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}
