/// Error types for promptcut-service
///
/// This module defines all error types that can occur in the service.
/// Errors are converted to appropriate HTTP responses for API clients.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::directive::DirectiveError;

/// Result type for promptcut-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Debug)]
pub enum AppError {
    /// Database operation failed
    DatabaseError(String),

    /// Directive failed validation; surfaced verbatim
    Directive(DirectiveError),

    /// File extension not in the supported set
    UnsupportedExtension(String),

    /// Declared size exceeds the hard cap
    FileTooLarge(i64),

    /// Reported size does not match the size declared at init
    SizeMismatch { declared: i64, reported: i64 },

    /// Upload session for the video is not in `uploaded` state
    VideoNotUploaded(Uuid),

    /// Payment is required and the quote is not paid
    PaymentRequired(Uuid),

    /// An active job already exists for the video
    DuplicateSubmission(Uuid),

    /// Resource not found
    NotFound(String),

    /// Requester does not own the referenced resource
    Forbidden(String),

    /// Job output not available yet
    NotReady(String),

    /// Download window has closed
    Gone(String),

    /// Internal server error
    Internal(String),

    /// Bad request
    BadRequest(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::Directive(err) => write!(f, "Validation error: {}", err),
            AppError::UnsupportedExtension(ext) => write!(
                f,
                "Unsupported extension: {} (supported: mp4, mkv, avi, mov, mpeg, ogv, webm)",
                ext
            ),
            AppError::FileTooLarge(size) => {
                write!(f, "File of {} bytes exceeds the 2 GiB limit", size)
            }
            AppError::SizeMismatch { declared, reported } => write!(
                f,
                "Uploaded size {} does not match declared size {}",
                reported, declared
            ),
            AppError::VideoNotUploaded(id) => write!(f, "Video {} has not finished uploading", id),
            AppError::PaymentRequired(id) => {
                write!(f, "Payment required before processing video {}", id)
            }
            AppError::DuplicateSubmission(id) => {
                write!(f, "An active job already exists for video {}", id)
            }
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::NotReady(msg) => write!(f, "Not ready: {}", msg),
            AppError::Gone(msg) => write!(f, "Gone: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
        }
    }
}

/// JSON error body returned to API clients
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: &'static str,
    pub message: String,
    pub status: u16,
}

impl AppError {
    /// Stable machine-readable code for each error kind
    pub fn code(&self) -> &'static str {
        match self {
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::Directive(err) => match err {
                DirectiveError::PromptTooLong => "PROMPT_TOO_LONG",
                DirectiveError::MissingKeepDirective => "MISSING_KEEP_DIRECTIVE",
                DirectiveError::DuplicateKeepDirective => "DUPLICATE_KEEP_DIRECTIVE",
                DirectiveError::InvalidTimeRange(_) => "INVALID_TIME_RANGE",
                DirectiveError::InvalidOrder(_) => "INVALID_ORDER",
                DirectiveError::UnsupportedOutputFormat(_) => "UNSUPPORTED_OUTPUT_FORMAT",
                DirectiveError::InvalidQuality(_) => "INVALID_QUALITY",
            },
            AppError::UnsupportedExtension(_) => "UNSUPPORTED_EXTENSION",
            AppError::FileTooLarge(_) => "FILE_TOO_LARGE",
            AppError::SizeMismatch { .. } => "SIZE_MISMATCH",
            AppError::VideoNotUploaded(_) => "VIDEO_NOT_UPLOADED",
            AppError::PaymentRequired(_) => "PAYMENT_REQUIRED",
            AppError::DuplicateSubmission(_) => "DUPLICATE_SUBMISSION",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotReady(_) => "NOT_READY",
            AppError::Gone(_) => "GONE",
            AppError::Internal(_) => "INTERNAL_SERVER_ERROR",
            AppError::BadRequest(_) => "INVALID_REQUEST",
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Directive(_)
            | AppError::UnsupportedExtension(_)
            | AppError::FileTooLarge(_)
            | AppError::SizeMismatch { .. }
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::VideoNotUploaded(_)
            | AppError::DuplicateSubmission(_)
            | AppError::NotReady(_) => StatusCode::CONFLICT,
            AppError::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Gone(_) => StatusCode::GONE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let response = ErrorResponse {
            error: match status {
                StatusCode::BAD_REQUEST => "Bad Request",
                StatusCode::PAYMENT_REQUIRED => "Payment Required",
                StatusCode::FORBIDDEN => "Forbidden",
                StatusCode::NOT_FOUND => "Not Found",
                StatusCode::CONFLICT => "Conflict",
                StatusCode::GONE => "Gone",
                StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
                _ => "Error",
            }
            .to_string(),
            code: self.code(),
            message: self.to_string(),
            status: status.as_u16(),
        };

        HttpResponse::build(status).json(response)
    }
}

impl From<DirectiveError> for AppError {
    fn from(err: DirectiveError) -> Self {
        AppError::Directive(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_taxonomy() {
        assert_eq!(
            AppError::Directive(DirectiveError::PromptTooLong).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::PaymentRequired(Uuid::nil()).status_code(),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            AppError::DuplicateSubmission(Uuid::nil()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Gone("expired".into()).status_code(),
            StatusCode::GONE
        );
        assert_eq!(
            AppError::Forbidden("not yours".into()).status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn directive_errors_surface_verbatim() {
        let err = AppError::from(DirectiveError::UnsupportedOutputFormat("avi".into()));
        assert_eq!(err.code(), "UNSUPPORTED_OUTPUT_FORMAT");
        assert!(err.to_string().contains("avi"));
    }
}
