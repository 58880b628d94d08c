//! API routes and handlers
//!
//! This module defines all API endpoints and their routing. Everything here
//! is mounted under `/api/v1`.

use axum::{routing::get, Router};

use crate::AppState;

mod audit_logs;
mod extract;
mod health;
mod institutions;
mod notifications;
mod requests;
mod stats;
mod users;

pub use health::*;

/// Create the full API router
pub fn routes() -> Router<AppState> {
    Router::new()
        // Health check endpoints
        .route("/health", get(health::health_check))
        .route("/health/detailed", get(health::health_check_detailed))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        // Workflow resources
        .nest("/institutions", institutions::routes())
        .nest("/requests", requests::routes())
        .nest("/users", users::routes())
        .nest("/notifications", notifications::routes())
        .nest("/audit-logs", audit_logs::routes())
        .nest("/stats", stats::routes())
}
