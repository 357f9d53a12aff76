//! Sherpa-ONNX Kokoro engine — implements [`SpeechEngine`] via `sherpa-rs`.
//!
//! Wraps `sherpa_rs::tts::KokoroTts`. The sherpa `create` method requires
//! `&mut self`, while our trait uses `&self`, so the inner engine sits in an
//! `Arc<Mutex<…>>`. Inference is CPU-bound and can take hundreds of
//! milliseconds per paragraph, so it is dispatched via
//! `tokio::task::spawn_blocking` — the Tokio worker thread is never stalled.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sherpa_rs::tts::{KokoroTts, KokoroTtsConfig};

use crate::engine::{EngineLoader, SpeechEngine, SynthesisParams, TtsAudio};
use crate::error::SpeechError;
use crate::voices;

/// Kokoro output sample rate (24 kHz).
pub const KOKORO_SAMPLE_RATE: u32 = 24_000;

/// Sherpa-ONNX Kokoro TTS engine.
pub struct SherpaKokoroEngine {
    /// The loaded sherpa-onnx TTS engine.
    ///
    /// Behind a [`Mutex`] because `KokoroTts::create` takes `&mut self`.
    /// `Arc` so it can be moved into `spawn_blocking` closures while the
    /// outer `&self` stays alive.
    engine: Arc<Mutex<KokoroTts>>,
}

impl SherpaKokoroEngine {
    /// Load the Kokoro model from a directory.
    ///
    /// The directory must contain `model.onnx`, `voices.bin`, `tokens.txt`,
    /// and an `espeak-ng-data/` subdirectory.
    pub fn load(model_dir: &Path) -> Result<Self, SpeechError> {
        if !model_dir.exists() {
            return Err(SpeechError::ModelNotFound(model_dir.to_path_buf()));
        }

        let model_path = model_dir.join("model.onnx");
        let voices_path = model_dir.join("voices.bin");
        let tokens_path = model_dir.join("tokens.txt");
        let data_dir = model_dir.join("espeak-ng-data");

        for path in [&model_path, &voices_path, &tokens_path] {
            if !path.exists() {
                return Err(SpeechError::ModelNotFound(path.clone()));
            }
        }

        tracing::info!(dir = %model_dir.display(), "Loading Kokoro TTS model");

        let config = KokoroTtsConfig {
            model: path_to_string(&model_path)?,
            voices: path_to_string(&voices_path)?,
            tokens: path_to_string(&tokens_path)?,
            data_dir: path_to_string(&data_dir)?,
            ..Default::default()
        };

        let engine = KokoroTts::new(config);

        tracing::info!("Kokoro TTS model loaded");

        Ok(Self {
            engine: Arc::new(Mutex::new(engine)),
        })
    }
}

#[async_trait::async_trait]
impl SpeechEngine for SherpaKokoroEngine {
    async fn synthesize(
        &self,
        text: &str,
        params: &SynthesisParams,
    ) -> Result<TtsAudio, SpeechError> {
        if text.trim().is_empty() {
            return Ok(TtsAudio {
                samples: Vec::new(),
                sample_rate: KOKORO_SAMPLE_RATE,
                duration: Duration::ZERO,
            });
        }

        let sid = voices::speaker_id(&params.voice);

        tracing::debug!(
            text_len = text.len(),
            voice = %params.voice,
            speaker_id = sid,
            speed = params.speed,
            "Synthesizing speech"
        );

        let engine = Arc::clone(&self.engine);
        let speed = params.speed;
        let text = text.to_string();

        let audio = tokio::task::spawn_blocking(move || {
            engine
                .lock()
                .map_err(|e| SpeechError::Synthesis(format!("TTS engine lock poisoned: {e}")))
                .and_then(|mut guard| {
                    guard
                        .create(&text, sid, speed)
                        .map_err(|e| SpeechError::Synthesis(format!("{e}")))
                })
        })
        .await
        .map_err(|e| SpeechError::Synthesis(format!("spawn_blocking join error: {e}")))??;

        let sample_rate = audio.sample_rate;
        let samples = audio.samples;

        #[allow(clippy::cast_precision_loss)]
        let duration = if sample_rate > 0 {
            Duration::from_secs_f64(samples.len() as f64 / f64::from(sample_rate))
        } else {
            Duration::ZERO
        };

        tracing::debug!(
            samples = samples.len(),
            sample_rate,
            duration_ms = duration.as_millis(),
            "Speech synthesized"
        );

        Ok(TtsAudio {
            samples,
            sample_rate,
            duration,
        })
    }
}

// ── Loader ─────────────────────────────────────────────────────────

/// Builds [`SherpaKokoroEngine`] instances for the lifecycle manager.
pub struct SherpaEngineLoader {
    model_dir: PathBuf,
}

impl SherpaEngineLoader {
    /// Create a loader for the model under `model_dir`.
    #[must_use]
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
        }
    }
}

#[async_trait::async_trait]
impl EngineLoader for SherpaEngineLoader {
    async fn load(&self) -> Result<Arc<dyn SpeechEngine>, SpeechError> {
        let model_dir = self.model_dir.clone();

        // Model construction reads hundreds of MB of weights; keep it off
        // the async worker threads.
        let engine = tokio::task::spawn_blocking(move || SherpaKokoroEngine::load(&model_dir))
            .await
            .map_err(|e| SpeechError::EngineLoad(format!("spawn_blocking join error: {e}")))??;

        Ok(Arc::new(engine))
    }

    fn assets_present(&self) -> bool {
        self.model_file().exists() && self.voices_file().exists()
    }

    fn model_file(&self) -> PathBuf {
        self.model_dir.join("model.onnx")
    }

    fn voices_file(&self) -> PathBuf {
        self.model_dir.join("voices.bin")
    }
}

/// Convert a path to a string, rejecting invalid UTF-8.
fn path_to_string(path: &Path) -> Result<String, SpeechError> {
    path.to_str()
        .map(ToString::to_string)
        .ok_or_else(|| SpeechError::EngineLoad(format!("Invalid path: {}", path.display())))
}
