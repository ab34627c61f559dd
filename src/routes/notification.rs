use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;

use crate::{error::Result, middleware::auth::AuthUser, AppState};

#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let notifications = state.notification_service.list_for(user.id).await?;
    Ok(Json(notifications))
}

#[axum::debug_handler]
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let count = state.notification_service.unread_count(user.id).await?;
    Ok(Json(json!({ "unread": count })))
}

#[axum::debug_handler]
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.notification_service.mark_read(user.id, id).await?;
    Ok(Json(json!({ "message": "Notification marked as read" })))
}

#[axum::debug_handler]
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let updated = state.notification_service.mark_all_read(user.id).await?;
    Ok(Json(json!({ "updated": updated })))
}
