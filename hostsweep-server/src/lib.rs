//! # hostsweep server
//!
//! Axum front end for the scan orchestrator. Everything is mounted under
//! `/api/v1`; published reports are served read-only under `/reports`.

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

/// Build the full application router around `state`.
pub fn create_app(state: AppState) -> Router {
    let reports = ServeDir::new(state.public_dir.join("reports"));

    routes::create_api_router()
        .nest_service("/reports", reports)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
