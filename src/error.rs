//! Error types for the PDF Splitter server

use std::time::Duration;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::artifacts::ArtifactError;
use crate::split::{RangeError, SplitError};

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Unknown, malformed, expired or evicted artifact id
    #[error("File not found or expired")]
    NotFound,

    #[error("Rate limit exceeded. Try again in {} seconds", .retry_after.as_secs())]
    RateLimited { retry_after: Duration },

    #[error("Only PDF files are allowed")]
    InvalidFileType(String),

    #[error("Invalid page range: {0}")]
    InvalidRange(#[from] RangeError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Malformed or oversized multipart body
    #[error("{message}")]
    Upload { status: StatusCode, message: String },

    /// The document could not be split
    #[error("Error processing PDF: {0}")]
    Processing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ArtifactError> for AppError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::NotFound => AppError::NotFound,
            ArtifactError::Duplicate(_) => AppError::Internal(err.to_string()),
        }
    }
}

impl From<SplitError> for AppError {
    fn from(err: SplitError) -> Self {
        match err {
            SplitError::Range(e) => AppError::InvalidRange(e),
            other => AppError::Processing(other.to_string()),
        }
    }
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::NotFound => (StatusCode::NOT_FOUND, "not_found", self.to_string()),
            AppError::RateLimited { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, "rate_limited", self.to_string())
            }
            AppError::InvalidFileType(name) => {
                tracing::debug!(file_name = %name, "Rejected non-PDF upload");
                (StatusCode::BAD_REQUEST, "invalid_file_type", self.to_string())
            }
            AppError::InvalidRange(_) => (StatusCode::BAD_REQUEST, "invalid_range", self.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Upload { status, message } => {
                let error_type = if *status == StatusCode::PAYLOAD_TOO_LARGE {
                    "payload_too_large"
                } else {
                    "bad_request"
                };
                (*status, error_type, message.clone())
            }
            AppError::Processing(msg) => {
                tracing::error!("Processing error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "processing_error",
                    self.to_string(),
                )
            }
            AppError::Io(e) => {
                tracing::error!("IO error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "io_error",
                    "IO error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let retry_after = match &self {
            AppError::RateLimited { retry_after } => Some(retry_after.as_secs()),
            _ => None,
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) && status.is_server_error() {
                Some(self.to_string())
            } else {
                None
            },
        });

        let mut response = (status, body).into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}
