//! orator-voice — the synthesis/playback core of orator.
//!
//! Streams text through a Kokoro TTS engine paragraph by paragraph while the
//! audio plays on the local output device. A background producer synthesizes
//! ahead of playback through a bounded queue, a per-session cancellation
//! token stops both halves cooperatively, and the engine itself is loaded on
//! demand and dropped again after an idle period with no active requests.
//!
//! ```text
//!   text ── segment ──> [p0, p1, …]
//!                          │ producer (one per request, engine serialized)
//!                          ▼
//!                    bounded queue (3)
//!                          │ consumer (plays each unit to completion)
//!                          ▼
//!                 playback + accumulated WAV
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod manager;
pub mod pipeline;
pub mod playback;
pub mod segment;
pub mod service;
pub mod session;
pub mod testing;
pub mod voices;
pub mod wav;

// Re-export key types for convenience
pub use config::ServiceConfig;
pub use engine::{EngineLoader, SpeechEngine, SynthesisParams, TtsAudio};
pub use error::SpeechError;
pub use playback::AudioSink;
pub use service::{HealthReport, SpeakOutcome, SpeakRequest, SpeechService};
