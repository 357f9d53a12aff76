//! orator server entry point.
//!
//! Parses flags, initializes logging, and starts the HTTP server. All
//! infrastructure wiring lives in `orator_axum::bootstrap`.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use orator_axum::{CorsConfig, ServerConfig, start_server};

/// Serve Kokoro text-to-speech with local playback.
///
/// Incoming text is synthesized paragraph by paragraph and played on the
/// default output device while synthesis runs ahead of playback; the final
/// waveform is saved as a WAV file.
#[derive(Parser)]
#[command(name = "orator", version)]
struct Cli {
    /// Port for the HTTP server
    #[arg(long, default_value_t = 5000, env = "ORATOR_PORT")]
    port: u16,

    /// Directory containing the Kokoro model files
    /// (model.onnx, voices.bin, tokens.txt, espeak-ng-data/)
    #[arg(long, default_value = "models/kokoro", env = "ORATOR_MODEL_DIR")]
    model_dir: PathBuf,

    /// Directory where synthesized WAV files are saved
    #[arg(long, default_value = "tts_output", env = "ORATOR_SAVE_DIR")]
    save_dir: PathBuf,

    /// Unload the engine after this many idle seconds with no active requests
    #[arg(long, default_value_t = 60, env = "ORATOR_IDLE_TIMEOUT")]
    idle_timeout: u64,

    /// Restrict CORS to these origins (repeatable; allows all when omitted)
    #[arg(long = "allow-origin")]
    allow_origins: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let cors = if cli.allow_origins.is_empty() {
        CorsConfig::AllowAll
    } else {
        CorsConfig::AllowOrigins(cli.allow_origins)
    };

    start_server(ServerConfig {
        port: cli.port,
        model_dir: cli.model_dir,
        save_dir: cli.save_dir,
        idle_timeout: Duration::from_secs(cli.idle_timeout),
        cors,
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "orator",
            "--port",
            "8123",
            "--model-dir",
            "/opt/kokoro",
            "--idle-timeout",
            "120",
            "--allow-origin",
            "http://localhost:3000",
        ]);
        assert_eq!(cli.port, 8123);
        assert_eq!(cli.model_dir, PathBuf::from("/opt/kokoro"));
        assert_eq!(cli.idle_timeout, 120);
        assert_eq!(cli.allow_origins, vec!["http://localhost:3000"]);
    }

    #[test]
    fn defaults_match_service_expectations() {
        let cli = Cli::parse_from(["orator"]);
        assert_eq!(cli.port, 5000);
        assert_eq!(cli.idle_timeout, 60);
        assert!(cli.allow_origins.is_empty());
    }
}
