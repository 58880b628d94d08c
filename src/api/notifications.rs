//! Notification API endpoints

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive},
        Json, Sse,
    },
    routing::{get, post, put},
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::json;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;

use super::extract::{AppJson, AppQuery};
use crate::models::{
    CreateNotificationRequest, ListResult, MarkAllReadRequest, MarkNotificationReadRequest,
    Notification, NotificationQuery, NotificationStats,
};
use crate::utils::{validation::require_non_blank, AppError};
use crate::AppState;

/// Create notification routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications).post(create_notification))
        .route("/stats", get(get_notification_stats))
        .route("/mark-all-read", post(mark_all_read))
        .route("/stream", get(notification_stream))
        .route("/{id}", get(get_notification))
        .route("/{id}/read", put(mark_notification_read))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserScope {
    user_id: Option<String>,
}

/// List a user's notifications, newest first
async fn list_notifications(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<NotificationQuery>,
) -> Result<Json<ListResult<Notification>>, AppError> {
    Ok(Json(state.notifications.list_for_user(&query).await?))
}

/// Create a new notification
async fn create_notification(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<Notification>), AppError> {
    let notification = state.notifications.create(req).await?;
    Ok((StatusCode::CREATED, Json(notification)))
}

async fn get_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Notification>, AppError> {
    Ok(Json(state.notifications.get(&id).await?))
}

/// Mark notification as read/unread
async fn mark_notification_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<MarkNotificationReadRequest>,
) -> Result<Json<Notification>, AppError> {
    Ok(Json(state.notifications.set_read(&id, req.read).await?))
}

/// Mark all notifications of a user as read
async fn mark_all_read(
    State(state): State<AppState>,
    AppJson(req): AppJson<MarkAllReadRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let count = state.notifications.mark_all_read(&req.user_id).await?;

    Ok(Json(json!({
        "success": true,
        "count": count,
        "message": format!("Marked {} notifications as read", count)
    })))
}

/// Get notification statistics
async fn get_notification_stats(
    State(state): State<AppState>,
    AppQuery(scope): AppQuery<UserScope>,
) -> Result<Json<NotificationStats>, AppError> {
    let user_id = require_non_blank("userId", scope.user_id.as_deref())?;
    Ok(Json(state.notifications.stats(&user_id).await?))
}

/// Server-Sent Events stream of new notifications for one user
async fn notification_stream(
    State(state): State<AppState>,
    AppQuery(scope): AppQuery<UserScope>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let user_id = require_non_blank("userId", scope.user_id.as_deref())?;
    let receiver = state.notifications.subscribe();

    // Lagged receivers skip what they missed rather than closing the stream
    let stream = BroadcastStream::new(receiver).filter_map(move |result| match result {
        Ok(notification) if notification.user_id == user_id => Event::default()
            .event("notification")
            .json_data(&notification)
            .ok()
            .map(Ok),
        _ => None,
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
