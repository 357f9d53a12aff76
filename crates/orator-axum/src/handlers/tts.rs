//! Handlers for `POST /tts` and `POST /stop`.
//!
//! Handlers are thin wrappers — each calls exactly one `SpeechService`
//! method and serializes the outcome. Request body shapes are co-located
//! here to keep the handler surface self-contained.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use orator_voice::service::{SpeakOutcome, SpeakRequest};

use crate::error::HttpError;
use crate::state::AppState;

// ── Request body shapes ────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    #[serde(default)]
    pub text: String,
    pub voice: Option<String>,
    pub speed: Option<f32>,
    pub lang: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StopRequest {
    pub session_id: Option<String>,
}

// ── Response shapes ────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct TtsResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_as: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paragraphs: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub success: bool,
    pub message: String,
}

// ── Handlers ───────────────────────────────────────────────────────

/// `POST /tts`
///
/// Runs the full synthesis/playback pipeline and returns once playback has
/// finished (or was stopped) and the waveform is on disk. A session stopped
/// before any audio was produced is a 200 with `success: false`, not an
/// error.
pub async fn tts(
    State(state): State<AppState>,
    Json(req): Json<TtsRequest>,
) -> Result<Json<TtsResponse>, HttpError> {
    let outcome = state
        .service
        .speak(SpeakRequest {
            text: req.text,
            voice: req.voice,
            speed: req.speed,
            lang: req.lang,
            session_id: req.session_id,
        })
        .await?;

    let response = match outcome {
        SpeakOutcome::Saved {
            filename,
            voice,
            paragraphs,
            duration_sec,
            session_id,
        } => TtsResponse {
            success: true,
            saved_as: Some(filename),
            voice: Some(voice),
            paragraphs: Some(paragraphs),
            duration_sec: Some(duration_sec),
            error: None,
            session_id,
        },
        SpeakOutcome::Stopped { session_id } => TtsResponse {
            success: false,
            saved_as: None,
            voice: None,
            paragraphs: None,
            duration_sec: None,
            error: Some("Playback stopped".to_string()),
            session_id,
        },
    };

    Ok(Json(response))
}

/// `POST /stop`
///
/// Signals a session's cancellation token and cuts playback immediately.
/// 404 when the session id is not registered.
pub async fn stop(
    State(state): State<AppState>,
    Json(req): Json<StopRequest>,
) -> Result<(StatusCode, Json<StopResponse>), HttpError> {
    let Some(session_id) = req.session_id.filter(|id| !id.is_empty()) else {
        return Err(HttpError::BadRequest("No session_id provided".to_string()));
    };

    if state.service.stop(&session_id) {
        Ok((
            StatusCode::OK,
            Json(StopResponse {
                success: true,
                message: format!("Stopped session {session_id}"),
            }),
        ))
    } else {
        Ok((
            StatusCode::NOT_FOUND,
            Json(StopResponse {
                success: false,
                message: format!("No active session found: {session_id}"),
            }),
        ))
    }
}
