use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    AppState,
    handlers::{adhoc, health, reports, scans},
};

/// Create all v1 API routes
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/network-scan/scan", post(adhoc::adhoc_scan_handler))
        .route(
            "/scans",
            get(scans::list_scans_handler).post(scans::submit_scan_handler),
        )
        .route("/scans/{id}", get(scans::scan_details_handler))
        .route(
            "/scans/{id}/generate-report",
            post(reports::generate_report_handler),
        )
        .route(
            "/scans/{id}/report-status",
            get(reports::report_status_handler),
        )
}
