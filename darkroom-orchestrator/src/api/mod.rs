//! API Module
//!
//! HTTP API layer for the orchestrator: the run lifecycle surface and the
//! completion intake endpoint the broker bridge delivers into.

pub mod error;
pub mod health;
pub mod run;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::service::pipeline::Orchestrator;

/// Create the main API router with all endpoints
pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Run lifecycle endpoints
        .route(
            "/projects/{owner}/{project}/process",
            post(run::start_process),
        )
        .route(
            "/projects/{owner}/{project}/preview/{image}",
            post(run::start_preview),
        )
        .route("/projects/{owner}/{project}/cancel", post(run::cancel_run))
        .route("/projects/{owner}/{project}/results", get(run::get_results))
        .route(
            "/projects/{owner}/{project}/advanced-ops",
            get(run::advanced_ops),
        )
        // Completion intake
        .route("/intake/report", post(run::intake_report))
        // Add state and middleware
        .with_state(orchestrator)
        .layer(TraceLayer::new_for_http())
}
