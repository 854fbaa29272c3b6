use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::judge::JudgeError;
use crate::store::StoreError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Always `false` for error responses.
    #[schema(example = false)]
    pub success: bool,
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `NOT_FOUND`,
    /// `UNAUTHORIZED`, `PERMISSION_DENIED`, `RATE_LIMITED`, `JUDGE_UNAVAILABLE`,
    /// `JUDGE_RATE_LIMITED`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Problem has no hidden test cases")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    Unauthorized,
    PermissionDenied,
    /// Rate limit exceeded. Contains seconds until retry is allowed.
    RateLimited {
        retry_after: u64,
    },
    /// The sandbox could not be reached or answered with an error.
    JudgeUnavailable(String),
    /// The sandbox kept throttling us past the retry budget.
    RateLimitExhausted(String),
    Internal(String),
}

fn body(code: &'static str, message: impl Into<String>) -> ErrorBody {
    ErrorBody {
        success: false,
        code,
        message: message.into(),
    }
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, body("VALIDATION_ERROR", msg)),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, body("NOT_FOUND", msg)),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                body("UNAUTHORIZED", "Authentication required"),
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                body("PERMISSION_DENIED", "Insufficient permissions"),
            ),
            AppError::RateLimited { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                body(
                    "RATE_LIMITED",
                    format!("Rate limit exceeded. Try again in {} seconds", retry_after),
                ),
            ),
            AppError::JudgeUnavailable(detail) => {
                tracing::error!("Judge unavailable: {}", detail);
                (
                    StatusCode::BAD_GATEWAY,
                    body("JUDGE_UNAVAILABLE", "Code execution service is unavailable"),
                )
            }
            AppError::RateLimitExhausted(detail) => {
                tracing::error!("Judge rate limit exhausted: {}", detail);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    body(
                        "JUDGE_RATE_LIMITED",
                        "Code execution service is busy, please retry later",
                    ),
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    body("INTERNAL_ERROR", "An unexpected error occurred"),
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let retry_after = if let AppError::RateLimited { retry_after } = &self {
            Some(*retry_after)
        } else {
            None
        };

        let (status, body) = self.status_and_body();

        if let Some(seconds) = retry_after {
            (status, [("Retry-After", seconds.to_string())], Json(body)).into_response()
        } else {
            (status, Json(body)).into_response()
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<JudgeError> for AppError {
    fn from(err: JudgeError) -> Self {
        match err {
            JudgeError::UnknownLanguage(lang) => {
                AppError::Validation(format!("Unsupported language '{lang}'"))
            }
            JudgeError::RateLimitExhausted { .. } => AppError::RateLimitExhausted(err.to_string()),
            JudgeError::Unavailable(_) | JudgeError::Timeout(_) | JudgeError::Malformed(_) => {
                AppError::JudgeUnavailable(err.to_string())
            }
        }
    }
}
