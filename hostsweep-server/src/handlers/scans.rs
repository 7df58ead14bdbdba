use axum::{
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

use hostsweep_core::scan::{ScanDetails, SubmissionReceipt, SubmitScan};
use hostsweep_core::types::Scan;

use super::parse_scan_id;
use crate::infra::{app_state::AppState, errors::AppResult};

#[derive(Debug, Deserialize)]
pub struct SubmitScanRequest {
    #[serde(default)]
    pub ips: Vec<String>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListScansQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ScanDetailsQuery {
    pub targets_page: Option<u32>,
    pub results_page: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ScanListResponse {
    pub scans: Vec<Scan>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

pub async fn submit_scan_handler(
    State(state): State<AppState>,
    payload: Result<Json<SubmitScanRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<SubmissionReceipt>)> {
    let Json(request) = payload?;
    let receipt = state
        .submissions
        .submit(SubmitScan {
            targets: request.ips,
            name: request.name,
        })
        .await?;
    Ok((StatusCode::ACCEPTED, Json(receipt)))
}

pub async fn list_scans_handler(
    State(state): State<AppState>,
    query: Result<Query<ListScansQuery>, QueryRejection>,
) -> AppResult<Json<ScanListResponse>> {
    let Query(query) = query?;
    let page = state
        .queries
        .list(query.page.unwrap_or(1), query.per_page)
        .await?;

    Ok(Json(ScanListResponse {
        scans: page.items,
        page: page.page,
        per_page: page.per_page,
        total: page.total,
    }))
}

pub async fn scan_details_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: Result<Query<ScanDetailsQuery>, QueryRejection>,
) -> AppResult<Json<ScanDetails>> {
    let scan_id = parse_scan_id(&id)?;
    let Query(query) = query?;
    let details = state
        .queries
        .details(
            scan_id,
            query.targets_page.unwrap_or(1),
            query.results_page.unwrap_or(1),
        )
        .await?;
    Ok(Json(details))
}
