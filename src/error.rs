use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;
use crate::models::ErrorResponse;

/// Errors surfaced by the matching core
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Operation timed out after {0}ms")]
    Timeout(u64),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
}

pub type MatchResult<T> = Result<T, MatchError>;

impl MatchError {
    /// Only transient failures may be retried by callers
    pub fn is_retryable(&self) -> bool {
        matches!(self, MatchError::Unavailable(_) | MatchError::Timeout(_))
    }

    fn code(&self) -> &'static str {
        match self {
            MatchError::NotFound(_) => "not_found",
            MatchError::InvalidArgument(_) => "invalid_argument",
            MatchError::Forbidden(_) => "forbidden",
            MatchError::Unavailable(_) => "unavailable",
            MatchError::Timeout(_) => "timeout",
            MatchError::AuthenticationFailed(_) => "authentication_failed",
        }
    }
}

impl From<sqlx::Error> for MatchError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Store error: {}", err);
        MatchError::Unavailable(err.to_string())
    }
}

impl From<validator::ValidationErrors> for MatchError {
    fn from(err: validator::ValidationErrors) -> Self {
        MatchError::InvalidArgument(err.to_string())
    }
}

impl ResponseError for MatchError {
    fn status_code(&self) -> StatusCode {
        match self {
            MatchError::NotFound(_) => StatusCode::NOT_FOUND,
            MatchError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            MatchError::Forbidden(_) => StatusCode::FORBIDDEN,
            MatchError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            MatchError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            MatchError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}
