//! Speech engine seam — engine-agnostic synthesis interfaces.
//!
//! The pipeline operates on trait objects (`Arc<dyn SpeechEngine>`,
//! `Arc<dyn EngineLoader>`) so the inference backend can be swapped without
//! touching the pipeline logic. The shipped backend is sherpa-onnx Kokoro
//! (feature `sherpa`, default); tests drive the pipeline with in-memory
//! fakes from [`crate::testing`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::error::SpeechError;

#[cfg(feature = "sherpa")]
pub mod sherpa;

// ── Shared types ───────────────────────────────────────────────────

/// Audio produced by one synthesis call.
#[derive(Debug, Clone)]
pub struct TtsAudio {
    /// PCM f32 samples, mono.
    pub samples: Vec<f32>,

    /// Sample rate of the audio (24 000 Hz for Kokoro).
    pub sample_rate: u32,

    /// Duration of the audio.
    pub duration: Duration,
}

/// Parameters for a single synthesis call.
#[derive(Debug, Clone)]
pub struct SynthesisParams {
    /// Voice id (e.g. `"af_bella"`). Already resolved against the catalogue.
    pub voice: String,

    /// Speed multiplier (0.5–2.0).
    pub speed: f32,

    /// Language tag (e.g. `"en-us"`). Backends that infer language from the
    /// voice id may ignore this.
    pub lang: String,
}

// ── Engine trait ───────────────────────────────────────────────────

/// Backend-agnostic text-to-speech engine.
///
/// Implementations must be `Send + Sync` so the pipeline can share them
/// across tasks. They are NOT required to tolerate concurrent `synthesize`
/// calls into the underlying model — the lifecycle manager wraps every
/// handle it vends in [`SerializedEngine`], which guarantees only one
/// synthesis call executes process-wide at any instant.
#[async_trait::async_trait]
pub trait SpeechEngine: Send + Sync {
    /// Synthesize one paragraph of text to audio.
    async fn synthesize(
        &self,
        text: &str,
        params: &SynthesisParams,
    ) -> Result<TtsAudio, SpeechError>;
}

// ── Loader trait ───────────────────────────────────────────────────

/// Constructs engines on demand for the lifecycle manager.
#[async_trait::async_trait]
pub trait EngineLoader: Send + Sync {
    /// Build a fresh engine. Called at most once per load cycle; errors leave
    /// the manager's slot empty.
    async fn load(&self) -> Result<Arc<dyn SpeechEngine>, SpeechError>;

    /// Whether the model assets this loader needs are present on disk.
    /// Consulted by the health endpoint without touching the engine slot.
    fn assets_present(&self) -> bool;

    /// Path of the model file, for health reporting.
    fn model_file(&self) -> PathBuf;

    /// Path of the voices file, for health reporting.
    fn voices_file(&self) -> PathBuf;
}

// ── Synthesis serialization ────────────────────────────────────────

/// Serializes every synthesis call through a single async mutex.
///
/// The inference engine is stateful and not reentrant: only one synthesis
/// call may execute process-wide at any instant, even across unrelated
/// requests. The lifecycle manager wraps every handle it vends in this type
/// and shares one lock across load cycles, so producers from simultaneous
/// requests queue here for their turn at the model.
pub struct SerializedEngine {
    inner: Arc<dyn SpeechEngine>,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl SerializedEngine {
    /// Wrap `inner`, serializing its calls through `lock`.
    #[must_use]
    pub fn new(inner: Arc<dyn SpeechEngine>, lock: Arc<tokio::sync::Mutex<()>>) -> Self {
        Self { inner, lock }
    }
}

#[async_trait::async_trait]
impl SpeechEngine for SerializedEngine {
    async fn synthesize(
        &self,
        text: &str,
        params: &SynthesisParams,
    ) -> Result<TtsAudio, SpeechError> {
        let _synthesis = self.lock.lock().await;
        self.inner.synthesize(text, params).await
    }
}
