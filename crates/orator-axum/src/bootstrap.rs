//! Server bootstrap — the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together:
//! the sherpa engine loader, the rodio playback actor, and the speech
//! service. Tests construct [`AppContext`] directly around a service built
//! from fakes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio_util::sync::CancellationToken;

use orator_voice::engine::sherpa::SherpaEngineLoader;
use orator_voice::playback::RodioSink;
use orator_voice::{ServiceConfig, SpeechService};

/// CORS configuration for the web server.
#[derive(Debug, Clone, Default)]
pub enum CorsConfig {
    /// Allow all origins (development mode — the browser extension posts
    /// from arbitrary page origins).
    #[default]
    AllowAll,
    /// Allow specific origins.
    AllowOrigins(Vec<String>),
}

/// Server configuration for the Axum adapter.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port for the HTTP server.
    pub port: u16,
    /// Directory containing the Kokoro model files.
    pub model_dir: PathBuf,
    /// Directory where synthesized WAV files are saved.
    pub save_dir: PathBuf,
    /// Engine idle unload timeout.
    pub idle_timeout: Duration,
    /// CORS configuration.
    pub cors: CorsConfig,
}

impl ServerConfig {
    /// Create config with default paths.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            port: 5000,
            model_dir: PathBuf::from("models/kokoro"),
            save_dir: PathBuf::from("tts_output"),
            idle_timeout: Duration::from_secs(60),
            cors: CorsConfig::default(),
        }
    }
}

/// Application context for the Axum adapter.
pub struct AppContext {
    /// The speech service facade.
    pub service: Arc<SpeechService>,
    /// Cancels the engine idle sweep on shutdown.
    pub idle_sweep: CancellationToken,
}

impl AppContext {
    /// Assemble a context around an already-built service and start its idle
    /// sweep. Used by tests to inject fake engines and sinks.
    #[must_use]
    pub fn new(service: Arc<SpeechService>) -> Self {
        let idle_sweep = service.spawn_idle_sweep();
        Self {
            service,
            idle_sweep,
        }
    }
}

/// Bootstrap the server with real infrastructure.
///
/// Opens the default audio output device and prepares the engine loader;
/// the engine itself is loaded lazily on the first request.
pub fn bootstrap(config: &ServerConfig) -> Result<AppContext> {
    std::fs::create_dir_all(&config.save_dir)?;

    tracing::info!(
        model_dir = %config.model_dir.display(),
        save_dir = %config.save_dir.display(),
        idle_timeout_s = config.idle_timeout.as_secs(),
        "orator bootstrap"
    );

    let service_config = ServiceConfig::default()
        .with_model_dir(config.model_dir.clone())
        .with_save_dir(config.save_dir.clone())
        .with_idle_timeout(config.idle_timeout);

    let loader = Arc::new(SherpaEngineLoader::new(config.model_dir.clone()));
    let sink = Arc::new(RodioSink::spawn()?);
    let service = Arc::new(SpeechService::new(loader, sink, service_config));

    Ok(AppContext::new(service))
}

/// Start the web server on the configured port.
///
/// Serves until ctrl-c, then stops the idle sweep and returns.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    use tokio::net::TcpListener;

    let ctx = bootstrap(&config)?;
    let idle_sweep = ctx.idle_sweep.clone();
    let app = crate::routes::create_router(ctx, &config.cors);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("orator TTS server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    idle_sweep.cancel();
    Ok(())
}
