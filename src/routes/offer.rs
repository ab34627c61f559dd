use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;

use crate::{
    dto::offer_dto::{
        AdminOfferQuery, BrowseOffersQuery, CreateOfferPayload, OfferReviewPayload,
        UpdateOfferPayload,
    },
    error::Result,
    middleware::auth::AuthUser,
    models::user::Role,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/company/offers",
    request_body = CreateOfferPayload,
    responses(
        (status = 201, description = "Offer created, pending admin approval"),
        (status = 400, description = "Invalid payload")
    )
)]
#[axum::debug_handler]
pub async fn create_offer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<CreateOfferPayload>,
) -> Result<impl IntoResponse> {
    let offer = state.offer_service.create(user.id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Internship offer created successfully. Waiting for admin approval.",
            "offer": offer,
        })),
    ))
}

#[utoipa::path(
    get,
    path = "/api/company/offers",
    responses((status = 200, description = "Offers posted by the calling company"))
)]
#[axum::debug_handler]
pub async fn company_list_offers(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let offers = state.offer_service.list_for_company(user.id).await?;
    Ok(Json(offers))
}

/// Companies see their own offers in any state; everyone else only approved
/// ones.
#[axum::debug_handler]
pub async fn get_offer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(offer_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let viewer = (user.role == Role::Student).then_some(user.id);
    let offer = state.offer_service.get(offer_id, viewer).await?;
    if offer.company_id != user.id
        && offer.status != crate::models::offer::OfferStatus::Approved
        && user.role != Role::Administrator
    {
        return Err(crate::error::Error::Forbidden("Access denied".into()));
    }
    Ok(Json(offer))
}

#[utoipa::path(
    put,
    path = "/api/company/offers/{id}",
    params(("id" = i64, Path, description = "Offer ID")),
    request_body = UpdateOfferPayload,
    responses(
        (status = 200, description = "Offer updated"),
        (status = 400, description = "Offer is no longer editable"),
        (status = 404, description = "Offer not found")
    )
)]
#[axum::debug_handler]
pub async fn update_offer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(offer_id): Path<i64>,
    Json(payload): Json<UpdateOfferPayload>,
) -> Result<impl IntoResponse> {
    let offer = state.offer_service.update(user.id, offer_id, payload).await?;
    Ok(Json(offer))
}

#[axum::debug_handler]
pub async fn close_offer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(offer_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let offer = state.offer_service.close(user.id, offer_id).await?;
    Ok(Json(json!({
        "message": "Offer closed successfully",
        "offer": offer,
    })))
}

#[axum::debug_handler]
pub async fn delete_offer(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(offer_id): Path<i64>,
) -> Result<impl IntoResponse> {
    state.offer_service.delete(user.id, offer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/student/offers",
    params(
        ("type" = Option<String>, Query, description = "Filter by offer type"),
        ("search" = Option<String>, Query, description = "Search title and description")
    ),
    responses((status = 200, description = "Approved offers open for applications"))
)]
#[axum::debug_handler]
pub async fn browse_offers(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<BrowseOffersQuery>,
) -> Result<impl IntoResponse> {
    let offers = state.offer_service.browse(user.id, query).await?;
    Ok(Json(offers))
}

#[axum::debug_handler]
pub async fn admin_list_offers(
    State(state): State<AppState>,
    Query(query): Query<AdminOfferQuery>,
) -> Result<impl IntoResponse> {
    let offers = state.offer_service.list_by_status(query.status).await?;
    Ok(Json(offers))
}

#[utoipa::path(
    post,
    path = "/api/admin/offers/{id}/review",
    params(("id" = i64, Path, description = "Offer ID")),
    request_body = OfferReviewPayload,
    responses(
        (status = 200, description = "Offer approved or rejected"),
        (status = 400, description = "Offer already reviewed"),
        (status = 404, description = "Offer not found")
    )
)]
#[axum::debug_handler]
pub async fn review_offer(
    State(state): State<AppState>,
    Path(offer_id): Path<i64>,
    Json(payload): Json<OfferReviewPayload>,
) -> Result<impl IntoResponse> {
    let decision = payload.decision;
    let offer = state
        .offer_service
        .review(offer_id, payload, &state.notification_service)
        .await?;
    Ok(Json(json!({
        "message": format!("Offer {} successfully", match decision {
            crate::dto::offer_dto::OfferDecision::Approved => "approved",
            crate::dto::offer_dto::OfferDecision::Rejected => "rejected",
        }),
        "offer": offer,
    })))
}
