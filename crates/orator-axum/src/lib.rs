//! orator-axum — HTTP adapter for the orator speech service.
//!
//! Exposes three routes:
//!
//! | route | method | purpose |
//! |---|---|---|
//! | `/tts` | POST | synthesize, play, and persist text |
//! | `/stop` | POST | cancel an in-flight session |
//! | `/health` | GET | uptime, engine residency, asset presence |

pub mod bootstrap;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

// Re-export primary types
pub use bootstrap::{AppContext, CorsConfig, ServerConfig, bootstrap, start_server};
pub use error::HttpError;
pub use routes::create_router;
pub use state::AppState;
