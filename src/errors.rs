use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Standard error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Transport failure or non-2xx answer from the weather provider.
    #[error("Weather service unavailable: {message}")]
    UpstreamUnavailable { status: Option<u16>, message: String },

    /// Provider status code to be forwarded as-is to the client.
    #[error("{message}")]
    UpstreamStatus { status: u16, message: String },

    #[error("Invalid data structure from weather service: {problem} {field}")]
    MalformedUpstreamPayload { field: String, problem: &'static str },

    #[error("{0}")]
    InvalidFilter(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl AppError {
    pub fn missing_field(field: impl Into<String>) -> Self {
        AppError::MalformedUpstreamPayload {
            field: field.into(),
            problem: "Missing",
        }
    }

    pub fn unexpected_type(field: impl Into<String>) -> Self {
        AppError::MalformedUpstreamPayload {
            field: field.into(),
            problem: "Unexpected type for",
        }
    }

    /// Turn a provider rejection that carried a status code into one that is
    /// forwarded to the client unchanged. Other errors pass through.
    pub fn forward_upstream_status(self) -> Self {
        match self {
            AppError::UpstreamUnavailable {
                status: Some(status),
                message,
            } => AppError::UpstreamStatus { status, message },
            other => other,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::UpstreamUnavailable { .. } | AppError::MalformedUpstreamPayload { .. } => {
                tracing::warn!("Upstream error: {}", self);
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            AppError::UpstreamStatus { status, message } => {
                let code = StatusCode::from_u16(*status)
                    .ok()
                    .filter(|s| s.is_client_error() || s.is_server_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                (code, message.clone())
            }
            AppError::InvalidFilter(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::DatabaseError(err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal database error".to_string(),
                )
            }
        };

        (status, axum::Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}
