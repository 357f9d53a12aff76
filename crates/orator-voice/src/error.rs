//! Speech pipeline error types.

use std::path::PathBuf;

/// Errors that can occur in the synthesis/playback pipeline.
///
/// A session stopped by the user is *not* an error — it surfaces as
/// [`SpeakOutcome::Stopped`](crate::service::SpeakOutcome::Stopped).
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    /// Request input rejected before any work started.
    #[error("{0}")]
    Validation(String),

    /// Model asset missing at the expected path.
    #[error("TTS model not found at {0}")]
    ModelNotFound(PathBuf),

    /// Engine construction failed.
    #[error("Failed to load TTS engine: {0}")]
    EngineLoad(String),

    /// The engine failed while synthesizing a paragraph.
    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    /// Failed to open the audio output stream.
    #[error("Failed to open audio output stream: {0}")]
    OutputStream(String),

    /// The playback actor thread is gone.
    #[error("Audio playback thread died")]
    PlaybackThreadDied,

    /// IO error (WAV persistence, save directory).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
