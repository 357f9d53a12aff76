//! Axum-specific error types and mappings.
//!
//! Maps [`SpeechError`] to HTTP status codes and a JSON error body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use orator_voice::SpeechError;
use serde::Serialize;
use thiserror::Error;

/// Axum-specific error type.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request (invalid input).
    #[error("{0}")]
    BadRequest(String),

    /// Service unavailable (audio device gone, etc.).
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Internal server error.
    #[error("{0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    status: u16,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = ErrorBody {
            error: message,
            status: status.as_u16(),
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<SpeechError> for HttpError {
    fn from(err: SpeechError) -> Self {
        match err {
            SpeechError::Validation(msg) => Self::BadRequest(msg),
            SpeechError::ModelNotFound(path) => Self::Internal(format!(
                "Failed to load TTS model: not found at {}",
                path.display()
            )),
            SpeechError::EngineLoad(msg) => {
                Self::Internal(format!("Failed to load TTS model: {msg}"))
            }
            SpeechError::OutputStream(msg) => Self::ServiceUnavailable(msg),
            SpeechError::PlaybackThreadDied => {
                Self::ServiceUnavailable("audio playback unavailable".to_string())
            }
            other => Self::Internal(other.to_string()),
        }
    }
}
