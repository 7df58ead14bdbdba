use axum::{extract::State, response::Json};
use serde::Serialize;

use hostsweep_core::orchestration::RuntimeStats;

use crate::infra::app_state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub jobs: RuntimeStats,
}

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        jobs: state.runtime.stats(),
    })
}
