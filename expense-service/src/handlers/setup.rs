use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{dtos::CreateAdminRequest, utils::ValidatedJson, AppState};

pub async fn setup_status(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.auth_service.setup_status().await?))
}

pub async fn create_admin(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateAdminRequest>,
) -> Result<impl IntoResponse, AppError> {
    let response = state.auth_service.create_admin(req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}
