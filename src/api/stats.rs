//! Portal statistics endpoint

use axum::{extract::State, routing::get, Json, Router};

use crate::{services::PortalStats, utils::AppError, AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(portal_stats))
}

async fn portal_stats(State(state): State<AppState>) -> Result<Json<PortalStats>, AppError> {
    Ok(Json(state.query.portal_stats().await?))
}
