//! Health endpoint for load balancers and orchestrators.
//!
//! It runs on a listener of its own: the ingress router enqueues every
//! path, so a probe sent there would be replayed against the calendar API.

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

/// Body returned by the health routes.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `healthy` while the process serves requests
    pub status: &'static str,
    /// Crate version
    pub version: &'static str,
}

/// Builds the health router: `GET /health` and `GET /health/live`.
///
/// Every other path is a 404.
pub fn health_router() -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(health_check))
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}
