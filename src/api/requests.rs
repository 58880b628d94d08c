//! Access request API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use super::extract::{AppJson, AppQuery};
use crate::{
    models::{
        ApiRequest, ListResult, RequestQuery, RequestStatus, StatusUpdateRequest,
        SubmitApiRequest,
    },
    utils::{validation::require_non_blank, AppError},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_requests).post(submit_request))
        .route("/{id}", get(get_request).patch(update_request_status))
}

async fn list_requests(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<RequestQuery>,
) -> Result<Json<ListResult<ApiRequest>>, AppError> {
    Ok(Json(state.query.list_requests(&query).await?))
}

async fn submit_request(
    State(state): State<AppState>,
    AppJson(req): AppJson<SubmitApiRequest>,
) -> Result<(StatusCode, Json<ApiRequest>), AppError> {
    let request = state.lifecycle.submit_request(req).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn get_request(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiRequest>, AppError> {
    Ok(Json(state.query.get_request(&id).await?))
}

/// Approve or reject a request: `{status, userId, reason?}`
async fn update_request_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<StatusUpdateRequest>,
) -> Result<Json<ApiRequest>, AppError> {
    let status: RequestStatus = require_non_blank("status", req.status.as_deref())?
        .parse()
        .map_err(AppError::validation)?;

    let request = state
        .lifecycle
        .update_request_status(&id, status, req.user_id.as_deref(), req.reason.as_deref())
        .await?;
    Ok(Json(request))
}
