//! Service configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Voice used when a request omits one or names an unknown voice.
pub const DEFAULT_VOICE: &str = "af_bella";

/// Default playback speed multiplier.
pub const DEFAULT_SPEED: f32 = 1.0;

/// Default language tag forwarded to the engine.
pub const DEFAULT_LANG: &str = "en-us";

/// Configuration for [`SpeechService`](crate::service::SpeechService).
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Directory containing `model.onnx`, `voices.bin`, `tokens.txt`, and
    /// an `espeak-ng-data/` subdirectory.
    pub model_dir: PathBuf,

    /// Directory where synthesized WAV files are written.
    pub save_dir: PathBuf,

    /// The engine is unloaded after this much idle time with no admitted
    /// requests. Also the sweep interval.
    pub idle_timeout: Duration,

    /// Capacity of the prefetch queue — how many paragraphs synthesis may
    /// run ahead of playback.
    pub queue_capacity: usize,

    /// Fallback voice for absent or unrecognized voice ids.
    pub default_voice: String,

    /// Fallback speed multiplier.
    pub default_speed: f32,

    /// Fallback language tag.
    pub default_lang: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models/kokoro"),
            save_dir: PathBuf::from("tts_output"),
            idle_timeout: Duration::from_secs(60),
            queue_capacity: 3,
            default_voice: DEFAULT_VOICE.to_string(),
            default_speed: DEFAULT_SPEED,
            default_lang: DEFAULT_LANG.to_string(),
        }
    }
}

impl ServiceConfig {
    /// Set the model directory.
    #[must_use]
    pub fn with_model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.model_dir = dir.into();
        self
    }

    /// Set the output directory for saved waveforms.
    #[must_use]
    pub fn with_save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.save_dir = dir.into();
        self
    }

    /// Set the idle unload timeout.
    #[must_use]
    pub const fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }
}
