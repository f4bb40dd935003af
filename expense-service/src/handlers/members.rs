use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{CreateMemberRequest, UpdateMemberRequest},
    middleware::AuthUser,
    models::Permission,
    services::require,
    utils::ValidatedJson,
    AppState,
};

pub async fn list_members(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::MembersView)?;
    Ok(Json(state.member_service.list(&ctx).await?))
}

pub async fn get_member(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::MembersView)?;
    let member = state.member_service.get(&ctx, &id).await?;
    Ok(Json(member.sanitized()))
}

pub async fn create_member(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateMemberRequest>,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::MembersCreate)?;
    let member = state.member_service.create(&ctx, req).await?;
    Ok((StatusCode::CREATED, Json(member)))
}

pub async fn update_member(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateMemberRequest>,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::MembersEdit)?;
    let member = state.member_service.update(&ctx, &id, req).await?;
    Ok(Json(member))
}

pub async fn delete_member(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::MembersDelete)?;
    state.member_service.delete(&ctx, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
