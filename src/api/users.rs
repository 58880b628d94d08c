//! User API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use super::extract::{AppJson, AppQuery};
use crate::{
    models::{ListResult, RegisterUserRequest, User, UserQuery},
    utils::AppError,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(register_user))
        .route("/{id}", get(get_user))
}

async fn list_users(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<UserQuery>,
) -> Result<Json<ListResult<User>>, AppError> {
    Ok(Json(state.query.list_users(&query).await?))
}

async fn register_user(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = state.lifecycle.register_user(req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.query.get_user(&id).await?))
}
