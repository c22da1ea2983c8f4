//! HTTP error type.
//!
//! Every failure leaves the server as `{"error": {"code", "message"}}`.
//! Credential failures share one generic 401 body; the precise reason
//! only reaches the logs.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use magicstream_auth::{AuthError, Outcome};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("bad request: {message}")]
    BadRequest { message: String },
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(e) => match e.outcome() {
                Outcome::Unauthorized => StatusCode::UNAUTHORIZED,
                Outcome::Forbidden => StatusCode::FORBIDDEN,
                Outcome::BadRequest => StatusCode::BAD_REQUEST,
                Outcome::Conflict => StatusCode::CONFLICT,
                Outcome::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                Outcome::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest {
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = match &self {
            ApiError::Auth(e) => match e.outcome() {
                Outcome::Unauthorized => {
                    tracing::debug!(reason = %e, "Request unauthorized");
                    ("UNAUTHORIZED", "Unauthorized".to_string())
                }
                Outcome::Forbidden => ("FORBIDDEN", "Forbidden".to_string()),
                Outcome::BadRequest => ("BAD_REQUEST", e.to_string()),
                Outcome::Conflict => ("CONFLICT", e.to_string()),
                Outcome::Unavailable => {
                    tracing::warn!(error = %e, "Session store unavailable");
                    (
                        "SERVICE_UNAVAILABLE",
                        "Service temporarily unavailable".to_string(),
                    )
                }
                Outcome::Internal => {
                    tracing::error!(error = %e, "Internal auth failure");
                    ("INTERNAL_ERROR", "Internal server error".to_string())
                }
            },
            ApiError::NotFound { message } => ("NOT_FOUND", message.clone()),
            ApiError::BadRequest { message } => ("BAD_REQUEST", message.clone()),
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
