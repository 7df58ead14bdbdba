use axum::{
    extract::{State, rejection::JsonRejection},
    response::Json,
};
use serde::Deserialize;

use hostsweep_core::scan::AdhocReport;

use crate::infra::{app_state::AppState, errors::AppResult};

#[derive(Debug, Deserialize)]
pub struct AdhocScanRequest {
    #[serde(default)]
    pub targets: Vec<String>,
}

/// Probe every target synchronously and return the merged live hosts.
pub async fn adhoc_scan_handler(
    State(state): State<AppState>,
    payload: Result<Json<AdhocScanRequest>, JsonRejection>,
) -> AppResult<Json<AdhocReport>> {
    let Json(request) = payload?;
    let report = state.adhoc.scan(request.targets).await?;
    Ok(Json(report))
}
