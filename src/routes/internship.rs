use axum::{
    extract::State,
    response::{IntoResponse, Json},
    Extension,
};

use crate::{error::Result, middleware::auth::AuthUser, AppState};

#[axum::debug_handler]
pub async fn my_internships(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let internships = state.internship_service.list_for_student(user.id).await?;
    Ok(Json(internships))
}
