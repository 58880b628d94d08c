//! Institution API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use super::extract::{AppJson, AppQuery};
use crate::{
    models::{
        Institution, InstitutionQuery, InstitutionStatus, ListResult,
        RegisterInstitutionRequest, StatusUpdateRequest, UpdateInstitutionRequest,
    },
    utils::{validation::require_non_blank, AppError},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_institutions).post(register_institution))
        .route(
            "/{id}",
            get(get_institution)
                .put(update_institution)
                .patch(update_institution_status),
        )
}

async fn list_institutions(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<InstitutionQuery>,
) -> Result<Json<ListResult<Institution>>, AppError> {
    Ok(Json(state.query.list_institutions(&query).await?))
}

async fn register_institution(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterInstitutionRequest>,
) -> Result<(StatusCode, Json<Institution>), AppError> {
    let institution = state.lifecycle.register_institution(req).await?;
    Ok((StatusCode::CREATED, Json(institution)))
}

async fn get_institution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Institution>, AppError> {
    Ok(Json(state.query.get_institution(&id).await?))
}

async fn update_institution(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<UpdateInstitutionRequest>,
) -> Result<Json<Institution>, AppError> {
    Ok(Json(state.lifecycle.update_institution_profile(&id, req).await?))
}

async fn update_institution_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<StatusUpdateRequest>,
) -> Result<Json<Institution>, AppError> {
    let status: InstitutionStatus = require_non_blank("status", req.status.as_deref())?
        .parse()
        .map_err(AppError::validation)?;

    let institution = state
        .lifecycle
        .update_institution_status(&id, status, req.user_id.as_deref())
        .await?;
    Ok(Json(institution))
}
