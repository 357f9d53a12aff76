//! Engine lifecycle — lazy load, idle unload, request admission.
//!
//! The engine is expensive (hundreds of MB of ONNX weights), so it is
//! constructed on first use and dropped again after an idle period with no
//! admitted requests. All lifecycle transitions go through [`EngineManager`];
//! request-scoped code only ever sees `Arc<dyn SpeechEngine>` handles.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use crate::engine::{EngineLoader, SerializedEngine, SpeechEngine};
use crate::error::SpeechError;

/// State shared with [`AdmissionGuard`]s.
struct AdmissionState {
    /// In-flight request count.
    active: AtomicUsize,

    /// When the engine was last touched (acquire or request exit).
    last_used: std::sync::Mutex<Instant>,
}

/// RAII admission ticket.
///
/// Dropping the guard decrements the in-flight count and refreshes the idle
/// clock — on every exit path, including early validation failures and
/// panics. Every increment therefore has exactly one matching decrement.
pub struct AdmissionGuard {
    state: Arc<AdmissionState>,
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        self.state.active.fetch_sub(1, Ordering::SeqCst);
        *self.state.last_used.lock().unwrap() = Instant::now();
    }
}

/// Owns the lazily-loaded speech engine.
pub struct EngineManager {
    loader: Arc<dyn EngineLoader>,

    /// The engine slot. The async mutex serializes concurrent `acquire`
    /// calls, so the engine is constructed at most once per load cycle, and
    /// makes the idle check atomic with respect to loads.
    slot: Mutex<Option<Arc<dyn SpeechEngine>>>,

    /// Lock-free mirror of `slot.is_some()` for health reporting.
    loaded: AtomicBool,

    /// The process-wide synthesis lock, shared across load cycles so that
    /// exclusion holds even through an unload/reload boundary.
    synthesis_lock: Arc<tokio::sync::Mutex<()>>,

    shared: Arc<AdmissionState>,
    idle_timeout: Duration,
}

impl EngineManager {
    #[must_use]
    pub fn new(loader: Arc<dyn EngineLoader>, idle_timeout: Duration) -> Self {
        Self {
            loader,
            slot: Mutex::new(None),
            loaded: AtomicBool::new(false),
            synthesis_lock: Arc::new(tokio::sync::Mutex::new(())),
            shared: Arc::new(AdmissionState {
                active: AtomicUsize::new(0),
                last_used: std::sync::Mutex::new(Instant::now()),
            }),
            idle_timeout,
        }
    }

    /// Admit a request. Hold the guard for the request's whole lifetime;
    /// while any guard is alive the idle sweep will not unload the engine.
    pub fn admit(&self) -> AdmissionGuard {
        self.shared.active.fetch_add(1, Ordering::SeqCst);
        AdmissionGuard {
            state: Arc::clone(&self.shared),
        }
    }

    /// Current in-flight request count.
    #[must_use]
    pub fn active_requests(&self) -> usize {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// Whether an engine handle currently exists.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Whether the loader's model assets are present on disk.
    #[must_use]
    pub fn assets_present(&self) -> bool {
        self.loader.assets_present()
    }

    /// Path of the model file, for health reporting.
    #[must_use]
    pub fn model_file(&self) -> std::path::PathBuf {
        self.loader.model_file()
    }

    /// Path of the voices file, for health reporting.
    #[must_use]
    pub fn voices_file(&self) -> std::path::PathBuf {
        self.loader.voices_file()
    }

    /// Return the engine handle, loading it if absent.
    ///
    /// Every handle is wrapped in [`SerializedEngine`] sharing the manager's
    /// synthesis lock, so callers get process-wide synthesis exclusion for
    /// free. Load errors propagate and leave the slot empty.
    pub async fn acquire(&self) -> Result<Arc<dyn SpeechEngine>, SpeechError> {
        self.touch();

        let mut slot = self.slot.lock().await;
        if let Some(engine) = slot.as_ref() {
            return Ok(Arc::clone(engine));
        }

        tracing::info!("Loading TTS engine");
        let inner = self.loader.load().await?;
        let engine: Arc<dyn SpeechEngine> = Arc::new(SerializedEngine::new(
            inner,
            Arc::clone(&self.synthesis_lock),
        ));
        *slot = Some(Arc::clone(&engine));
        self.loaded.store(true, Ordering::SeqCst);
        tracing::info!("TTS engine loaded");

        Ok(engine)
    }

    fn touch(&self) {
        *self.shared.last_used.lock().unwrap() = Instant::now();
    }

    /// Drop the engine if it has been idle past the timeout with no admitted
    /// requests.
    ///
    /// The admission counter is read while holding the slot lock, so the
    /// handle is never released while a request is in flight — a request
    /// admits itself before it can reach `acquire`.
    pub async fn unload_if_idle(&self) {
        let mut slot = self.slot.lock().await;
        if slot.is_none() {
            return;
        }
        if self.shared.active.load(Ordering::SeqCst) > 0 {
            return;
        }
        let idle_for = self.shared.last_used.lock().unwrap().elapsed();
        if idle_for <= self.idle_timeout {
            return;
        }

        *slot = None;
        self.loaded.store(false, Ordering::SeqCst);
        tracing::info!(
            idle_s = idle_for.as_secs(),
            "TTS engine unloaded after idle period; memory freed"
        );
    }

    /// Spawn the periodic idle sweep.
    ///
    /// Ticks every `idle_timeout` until the returned token is cancelled. The
    /// token is owned by the composition root so the sweep can be stopped at
    /// process shutdown.
    pub fn spawn_idle_sweep(manager: &Arc<Self>) -> CancellationToken {
        let cancel = CancellationToken::new();
        let manager = Arc::clone(manager);
        let token = cancel.clone();

        tokio::spawn(async move {
            let mut ticker = interval(manager.idle_timeout);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick fires immediately; consume it so a freshly
            // started service is not swept before first use.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => manager.unload_if_idle().await,
                    () = token.cancelled() => break,
                }
            }
            tracing::debug!("Idle sweep stopped");
        });

        cancel
    }
}
