use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;

use crate::{
    dto::application_dto::{
        ApplicationReviewPayload, CompanyApplicationsQuery, InterviewDecision,
        InterviewDecisionPayload, ReviewDecision,
    },
    error::{Error, Result},
    middleware::auth::AuthUser,
    utils::validation::save_cv_file,
    AppState,
};

/// Multipart submission: `offer_id`, optional `cover_letter`, required `cv`.
#[axum::debug_handler]
pub async fn submit_application(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse> {
    let mut offer_id: Option<i64> = None;
    let mut cover_letter: Option<String> = None;
    let mut cv: Option<(String, bytes::Bytes)> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "offer_id" => {
                let raw = field.text().await?;
                offer_id = Some(
                    raw.parse()
                        .map_err(|_| Error::Validation("Invalid offer_id".into()))?,
                );
            }
            "cover_letter" => cover_letter = Some(field.text().await?),
            "cv" => {
                let filename = field.file_name().unwrap_or("cv.bin").to_string();
                let data = field.bytes().await?;
                cv = Some((filename, data));
            }
            _ => {}
        }
    }

    let offer_id = offer_id.ok_or_else(|| Error::Validation("offer_id is required".into()))?;
    let (filename, data) = cv.ok_or_else(|| Error::Validation("CV/Resume is required".into()))?;
    let cv_path = save_cv_file(&filename, &data).await?;

    let submitted = state
        .application_service
        .submit(
            user.id,
            offer_id,
            cover_letter,
            cv_path.clone(),
            &state.notification_service,
        )
        .await;

    let application = match submitted {
        Ok(application) => application,
        Err(err) => {
            // A rejected submission must not leave the stored file behind.
            if let Err(io_err) = tokio::fs::remove_file(&cv_path).await {
                tracing::warn!("Failed to remove stored CV {}: {}", cv_path, io_err);
            }
            return Err(err);
        }
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Application submitted successfully",
            "application": application,
        })),
    ))
}

#[axum::debug_handler]
pub async fn my_applications(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let applications = state.application_service.list_for_student(user.id).await?;
    Ok(Json(applications))
}

#[axum::debug_handler]
pub async fn company_applications(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Query(query): Query<CompanyApplicationsQuery>,
) -> Result<impl IntoResponse> {
    let applications = state
        .application_service
        .list_for_company(user.id, query.offer_id)
        .await?;
    Ok(Json(applications))
}

#[axum::debug_handler]
pub async fn review_application(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(application_id): Path<i64>,
    Json(payload): Json<ApplicationReviewPayload>,
) -> Result<impl IntoResponse> {
    let decision = payload.decision;
    let application = state
        .application_service
        .review(user.id, application_id, payload, &state.notification_service)
        .await?;
    let status_text = match decision {
        ReviewDecision::Interview => "passed to interview",
        ReviewDecision::Rejected => "rejected",
    };
    Ok(Json(json!({
        "message": format!("Application {} successfully", status_text),
        "application": application,
    })))
}

#[axum::debug_handler]
pub async fn interview_decision(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(application_id): Path<i64>,
    Json(payload): Json<InterviewDecisionPayload>,
) -> Result<impl IntoResponse> {
    let decision = payload.decision;
    let application = state
        .application_service
        .decide(
            user.id,
            application_id,
            payload,
            &state.internship_service,
            &state.notification_service,
        )
        .await?;
    let status_text = match decision {
        InterviewDecision::Accepted => "accepted",
        InterviewDecision::Rejected => "rejected",
    };
    Ok(Json(json!({
        "message": format!("Application {} successfully", status_text),
        "application": application,
    })))
}

/// Streams the applicant's stored CV back to the owning company.
#[axum::debug_handler]
pub async fn download_cv(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(application_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let cv_path = state
        .application_service
        .cv_path(user.id, application_id)
        .await?;

    let file = tokio::fs::File::open(&cv_path)
        .await
        .map_err(|_| Error::NotFound("CV file not found".into()))?;
    let stream = tokio_util::io::ReaderStream::new(file);

    let filename = std::path::Path::new(&cv_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("cv.bin")
        .to_string();

    Ok((
        [(
            axum::http::header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )],
        axum::body::Body::from_stream(stream),
    ))
}

/// On-demand scoring. Unlike the background queue this surfaces scoring
/// failures to the caller.
#[axum::debug_handler]
pub async fn score_application(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(application_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let result = state
        .application_service
        .score_now(user.id, application_id, &state.match_service)
        .await?;
    Ok(Json(json!({
        "match_score": result.score,
        "match_analysis": result.analysis,
    })))
}
