//! Audit log API endpoints

use axum::{
    extract::State,
    routing::get,
    Json, Router,
};

use super::extract::AppQuery;
use crate::{
    models::{AuditLogEntry, AuditLogQuery, ListResult},
    utils::AppError,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_audit_logs))
}

async fn list_audit_logs(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<AuditLogQuery>,
) -> Result<Json<ListResult<AuditLogEntry>>, AppError> {
    Ok(Json(state.audit.list(&query).await?))
}
