use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;
use crate::lifecycle::ResilienceStatus;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

/// Liveness probe.
pub async fn get_health() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "UP",
    })
}

/// Breaker states and cache occupancy for both dependencies.
pub async fn get_resilience(State(state): State<AppState>) -> Json<ResilienceStatus> {
    Json(state.components.resilience_status())
}
