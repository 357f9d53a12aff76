//! Fake engine, loader, and sink implementations for tests.
//!
//! Kept in the library (rather than a tests-only module) so integration
//! suites and downstream adapters can drive the full pipeline without audio
//! hardware or model files on disk.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::engine::{EngineLoader, SpeechEngine, SynthesisParams, TtsAudio};
use crate::error::SpeechError;
use crate::playback::AudioSink;

// ── FakeEngine ─────────────────────────────────────────────────────

/// Deterministic in-memory engine.
///
/// Each call produces a fixed-size sample block whose value is derived from
/// the input text, so concatenation order is observable in the output.
/// Instrumented to detect overlapping `synthesize` calls — the pipeline's
/// mutual-exclusion guarantee is asserted through [`overlap_detected`].
///
/// [`overlap_detected`]: FakeEngine::overlap_detected
pub struct FakeEngine {
    sample_rate: u32,
    samples_per_unit: usize,
    delay: Duration,
    fail_at: Option<usize>,
    drift: Option<(usize, u32)>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    overlap: AtomicBool,
    texts: Mutex<Vec<String>>,
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeEngine {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sample_rate: 24_000,
            samples_per_unit: 4,
            delay: Duration::ZERO,
            fail_at: None,
            drift: None,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            overlap: AtomicBool::new(false),
            texts: Mutex::new(Vec::new()),
        }
    }

    /// Sleep this long inside each call (widens the overlap-detection window).
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail the `n`-th call (0-based) with a synthesis error.
    #[must_use]
    pub const fn with_failure_at(mut self, call: usize) -> Self {
        self.fail_at = Some(call);
        self
    }

    /// Report a different sample rate from the `n`-th call (0-based) onward.
    #[must_use]
    pub const fn with_rate_drift_at(mut self, call: usize, rate: u32) -> Self {
        self.drift = Some((call, rate));
        self
    }

    /// Texts synthesized so far, in call order.
    #[must_use]
    pub fn synthesized(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    /// Total calls observed.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Whether two calls were ever in flight simultaneously.
    #[must_use]
    pub fn overlap_detected(&self) -> bool {
        self.overlap.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SpeechEngine for FakeEngine {
    async fn synthesize(
        &self,
        text: &str,
        _params: &SynthesisParams,
    ) -> Result<TtsAudio, SpeechError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlap.store(true, Ordering::SeqCst);
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.texts.lock().unwrap().push(text.to_string());

        if self.fail_at == Some(call) {
            return Err(SpeechError::Synthesis(format!(
                "injected failure at call {call}"
            )));
        }

        let sample_rate = match self.drift {
            Some((from, rate)) if call >= from => rate,
            _ => self.sample_rate,
        };

        #[allow(clippy::cast_precision_loss)]
        let value = (text.len() as f32).mul_add(0.001, 0.01);
        let samples = vec![value; self.samples_per_unit];

        #[allow(clippy::cast_precision_loss)]
        let duration = Duration::from_secs_f64(samples.len() as f64 / f64::from(sample_rate));

        Ok(TtsAudio {
            samples,
            sample_rate,
            duration,
        })
    }
}

// ── FakeLoader ─────────────────────────────────────────────────────

/// Loader that vends a pre-built engine (or fails on demand).
pub struct FakeLoader {
    engine: Option<Arc<dyn SpeechEngine>>,
    load_calls: Arc<AtomicUsize>,
}

impl FakeLoader {
    /// A loader that always succeeds with `engine`.
    #[must_use]
    pub fn new(engine: Arc<dyn SpeechEngine>) -> Self {
        Self {
            engine: Some(engine),
            load_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A loader whose assets are "missing": `load` fails, `assets_present`
    /// reports false.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            engine: None,
            load_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter of `load` calls (usable after the loader is moved).
    #[must_use]
    pub fn load_calls_handle(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.load_calls)
    }
}

#[async_trait::async_trait]
impl EngineLoader for FakeLoader {
    async fn load(&self) -> Result<Arc<dyn SpeechEngine>, SpeechError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        self.engine.clone().ok_or_else(|| {
            SpeechError::EngineLoad("injected load failure: assets missing".to_string())
        })
    }

    fn assets_present(&self) -> bool {
        self.engine.is_some()
    }

    fn model_file(&self) -> PathBuf {
        PathBuf::from("fake/model.onnx")
    }

    fn voices_file(&self) -> PathBuf {
        PathBuf::from("fake/voices.bin")
    }
}

// ── FakeSink ───────────────────────────────────────────────────────

/// Records played units instead of touching an output device.
///
/// Optionally cancels a session token after the `n`-th unit finishes, to
/// simulate a stop command arriving mid-request.
pub struct FakeSink {
    played: Mutex<Vec<(Vec<f32>, u32)>>,
    playing: AtomicBool,
    stops: AtomicUsize,
    delay: Duration,
    cancel_after: Mutex<Option<(usize, CancellationToken)>>,
}

impl Default for FakeSink {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeSink {
    #[must_use]
    pub fn new() -> Self {
        Self {
            played: Mutex::new(Vec::new()),
            playing: AtomicBool::new(false),
            stops: AtomicUsize::new(0),
            delay: Duration::ZERO,
            cancel_after: Mutex::new(None),
        }
    }

    /// Sleep this long per unit, simulating playback time.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Cancel `token` once `units` units have finished playing.
    #[must_use]
    pub fn cancel_after_units(self, units: usize, token: CancellationToken) -> Self {
        *self.cancel_after.lock().unwrap() = Some((units, token));
        self
    }

    /// Units played so far, in order, as `(samples, sample_rate)` pairs.
    #[must_use]
    pub fn played(&self) -> Vec<(Vec<f32>, u32)> {
        self.played.lock().unwrap().clone()
    }

    /// Number of `stop` calls observed.
    #[must_use]
    pub fn stop_calls(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl AudioSink for FakeSink {
    async fn play(&self, samples: Vec<f32>, sample_rate: u32) -> Result<(), SpeechError> {
        self.playing.store(true, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let played_count = {
            let mut played = self.played.lock().unwrap();
            played.push((samples, sample_rate));
            played.len()
        };

        if let Some((after, token)) = self.cancel_after.lock().unwrap().as_ref() {
            if played_count >= *after {
                token.cancel();
            }
        }

        self.playing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}
