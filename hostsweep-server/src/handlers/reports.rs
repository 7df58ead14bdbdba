use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use hostsweep_core::report::{ReportStatusView, ReportTicket};

use super::parse_scan_id;
use crate::infra::{app_state::AppState, errors::AppResult};

pub async fn generate_report_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<ReportTicket>)> {
    let scan_id = parse_scan_id(&id)?;
    let ticket = state.reports.trigger(scan_id).await?;
    Ok((StatusCode::ACCEPTED, Json(ticket)))
}

pub async fn report_status_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ReportStatusView>> {
    let scan_id = parse_scan_id(&id)?;
    Ok(Json(state.reports.status(scan_id).await?))
}
