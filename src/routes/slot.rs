use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;

use crate::{
    dto::slot_dto::{CreateSlotsPayload, SelectSlotPayload},
    error::Result,
    middleware::auth::AuthUser,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/company/offers/{id}/slots",
    params(("id" = i64, Path, description = "Offer ID")),
    request_body = CreateSlotsPayload,
    responses(
        (status = 201, description = "Interview slots created"),
        (status = 400, description = "Invalid time window"),
        (status = 404, description = "Offer not found")
    )
)]
#[axum::debug_handler]
pub async fn create_slots(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(offer_id): Path<i64>,
    Json(payload): Json<CreateSlotsPayload>,
) -> Result<impl IntoResponse> {
    let slots = state
        .slot_service
        .create_slots(user.id, offer_id, payload)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Interview slots created successfully",
            "slots": slots,
        })),
    ))
}

#[axum::debug_handler]
pub async fn list_slots(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(offer_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let slots = state.slot_service.list_for_offer(user.id, offer_id).await?;
    Ok(Json(slots))
}

#[utoipa::path(
    delete,
    path = "/api/company/slots/{id}",
    params(("id" = i64, Path, description = "Slot ID")),
    responses(
        (status = 204, description = "Slot deleted"),
        (status = 400, description = "Slot already booked"),
        (status = 404, description = "Slot not found")
    )
)]
#[axum::debug_handler]
pub async fn delete_slot(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(slot_id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.slot_service.delete(user.id, slot_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn select_slot(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(application_id): Path<i64>,
    Json(payload): Json<SelectSlotPayload>,
) -> Result<impl IntoResponse> {
    let application = state
        .slot_service
        .select(
            user.id,
            application_id,
            payload.slot_id,
            &state.notification_service,
        )
        .await?;
    Ok(Json(json!({
        "message": "Interview slot selected successfully",
        "application": application,
    })))
}
