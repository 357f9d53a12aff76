//! Handler for `GET /health`.

use axum::Json;
use axum::extract::State;

use orator_voice::HealthReport;

use crate::state::AppState;

/// `GET /health`
///
/// Reports uptime, whether the engine is resident, and a degraded status
/// when the model assets are missing from storage.
pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(state.service.health())
}
