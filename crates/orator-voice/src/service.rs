//! `SpeechService` — the facade that runs a complete synthesis request.
//!
//! Owns the engine lifecycle manager, the session registry, and the playback
//! sink as explicit state; request handlers hold the service behind an `Arc`
//! and never touch globals.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::engine::{EngineLoader, SynthesisParams};
use crate::error::SpeechError;
use crate::manager::EngineManager;
use crate::pipeline;
use crate::playback::AudioSink;
use crate::segment::split_paragraphs;
use crate::session::SessionRegistry;
use crate::voices::resolve_voice;
use crate::wav;

// ── Request / outcome types ────────────────────────────────────────

/// A synthesis request, already deserialized by the transport layer.
#[derive(Debug, Clone, Default)]
pub struct SpeakRequest {
    pub text: String,
    pub voice: Option<String>,
    pub speed: Option<f32>,
    pub lang: Option<String>,
    pub session_id: Option<String>,
}

/// Outcome of a completed request.
#[derive(Debug)]
pub enum SpeakOutcome {
    /// Audio was produced (possibly cut short by a stop) and persisted.
    Saved {
        filename: String,
        voice: String,
        paragraphs: usize,
        duration_sec: f64,
        session_id: String,
    },

    /// The session was stopped before any audio was produced. Not an error.
    Stopped { session_id: String },
}

/// Snapshot for the health endpoint.
#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub uptime_seconds: f64,
    pub engine_loaded: bool,
    pub model_file: PathBuf,
    pub voices_file: PathBuf,
    pub idle_timeout_seconds: u64,
    pub active_requests: usize,
}

// ── Service ────────────────────────────────────────────────────────

/// Runs synthesis requests end to end: admission, segmentation, the
/// prefetching pipeline, and waveform persistence.
pub struct SpeechService {
    manager: Arc<EngineManager>,
    sessions: SessionRegistry,
    sink: Arc<dyn AudioSink>,
    config: ServiceConfig,
    started_at: Instant,
}

impl SpeechService {
    #[must_use]
    pub fn new(
        loader: Arc<dyn EngineLoader>,
        sink: Arc<dyn AudioSink>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            manager: Arc::new(EngineManager::new(loader, config.idle_timeout)),
            sessions: SessionRegistry::new(),
            sink,
            config,
            started_at: Instant::now(),
        }
    }

    /// Spawn the engine idle sweep. The returned token stops it.
    pub fn spawn_idle_sweep(&self) -> CancellationToken {
        EngineManager::spawn_idle_sweep(&self.manager)
    }

    /// Run one synthesis request to completion.
    pub async fn speak(&self, req: SpeakRequest) -> Result<SpeakOutcome, SpeechError> {
        // Admission is taken before validation so the idle sweep cannot
        // unload the engine between here and acquire(). The guard's Drop
        // releases the slot and refreshes the idle clock on every exit path.
        let _admission = self.manager.admit();

        let text = req.text.trim();
        if text.is_empty() {
            return Err(SpeechError::Validation("No text provided".to_string()));
        }

        let voice = resolve_voice(req.voice.as_deref(), &self.config.default_voice).to_string();
        let speed = req
            .speed
            .unwrap_or(self.config.default_speed)
            .clamp(0.5, 2.0);
        let lang = req
            .lang
            .clone()
            .unwrap_or_else(|| self.config.default_lang.clone());
        let session_id = req
            .session_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let paragraphs = split_paragraphs(text);
        let paragraph_count = paragraphs.len();

        tracing::info!(
            session_id = %session_id,
            voice = %voice,
            speed,
            lang = %lang,
            paragraphs = paragraph_count,
            chars = text.len(),
            "TTS request received"
        );

        let engine = self.manager.acquire().await?;
        let cancel = self.sessions.create(&session_id);

        let result = pipeline::run(
            engine,
            Arc::clone(&self.sink),
            paragraphs,
            SynthesisParams {
                voice: voice.clone(),
                speed,
                lang,
            },
            cancel,
            self.config.queue_capacity,
        )
        .await;

        // The session entry never outlives the request, whichever way it ended.
        self.sessions.remove(&session_id);

        let output = result?;

        if output.samples.is_empty() {
            tracing::info!(session_id = %session_id, "Stopped before any audio was produced");
            return Ok(SpeakOutcome::Stopped { session_id });
        }

        let filename = wav::output_file_name(&voice);
        let path = self.config.save_dir.join(&filename);
        let duration_sec = output.duration_sec();
        let rate = output
            .sample_rate
            .expect("non-empty accumulation always has a sample rate");
        let samples = output.samples;

        tokio::task::spawn_blocking(move || wav::write_wav(&path, &samples, rate))
            .await
            .map_err(|e| SpeechError::Io(std::io::Error::other(e)))??;

        tracing::info!(
            session_id = %session_id,
            file = %filename,
            duration_sec,
            units_played = output.units_played,
            "Audio saved"
        );

        Ok(SpeakOutcome::Saved {
            filename,
            voice,
            paragraphs: paragraph_count,
            duration_sec,
            session_id,
        })
    }

    /// Stop an in-flight session. Returns whether the session was known.
    ///
    /// Signals the session's token and cuts the output device immediately;
    /// the pipeline observes the token at its next checkpoint.
    pub fn stop(&self, session_id: &str) -> bool {
        let known = self.sessions.signal(session_id);
        if known {
            self.sink.stop();
            tracing::info!(session_id, "Stop requested");
        } else {
            tracing::debug!(session_id, "Stop for unknown session");
        }
        known
    }

    /// Health snapshot: asset presence, engine residency, uptime.
    #[must_use]
    pub fn health(&self) -> HealthReport {
        let engine_loaded = self.manager.is_loaded();
        let status = if self.manager.assets_present() {
            if engine_loaded {
                "healthy".to_string()
            } else {
                "healthy (engine unloaded - idle)".to_string()
            }
        } else {
            "degraded: model files missing".to_string()
        };

        HealthReport {
            status,
            uptime_seconds: self.started_at.elapsed().as_secs_f64(),
            engine_loaded,
            model_file: self.manager.model_file(),
            voices_file: self.manager.voices_file(),
            idle_timeout_seconds: self.config.idle_timeout.as_secs(),
            active_requests: self.manager.active_requests(),
        }
    }

    /// The session registry (exposed for tests and diagnostics).
    #[must_use]
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// In-flight request count.
    #[must_use]
    pub fn active_requests(&self) -> usize {
        self.manager.active_requests()
    }

    #[must_use]
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}
