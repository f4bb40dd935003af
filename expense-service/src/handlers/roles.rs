use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{CreateRoleRequest, PermissionCatalogResponse, UpdateRoleRequest},
    middleware::AuthUser,
    models::{permission_catalog, AuditAction, Permission},
    services::{require, require_any},
    utils::{clean_name, ValidatedJson},
    AppState,
};

fn blank_name() -> AppError {
    AppError::bad_request("validation_error", "Role name must not be blank")
}

pub async fn list_roles(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    require_any(&ctx, &[Permission::RolesManage, Permission::MembersView])?;
    Ok(Json(state.roles.list(ctx.family_id()).await?))
}

pub async fn list_permissions(AuthUser(ctx): AuthUser) -> Result<impl IntoResponse, AppError> {
    require_any(&ctx, &[Permission::RolesManage, Permission::MembersView])?;
    Ok(Json(PermissionCatalogResponse {
        groups: permission_catalog(),
    }))
}

pub async fn create_role(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::RolesManage)?;
    let family_id = ctx.require_family()?;
    let name = clean_name(&req.name).ok_or_else(blank_name)?;

    let role = state.roles.create(family_id, name, req.permissions).await?;
    state
        .audit
        .record(AuditAction::RoleCreated, ctx.member_id(), Some(family_id), Some(&role.id))
        .await;

    Ok((StatusCode::CREATED, Json(role)))
}

pub async fn update_role(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::RolesManage)?;
    let name = match req.name {
        Some(name) => Some(clean_name(&name).ok_or_else(blank_name)?),
        None => None,
    };

    let role = state
        .roles
        .update(&id, ctx.family_id(), name, req.permissions)
        .await?;
    state
        .audit
        .record(
            AuditAction::RoleUpdated,
            ctx.member_id(),
            role.family_id.as_deref(),
            Some(&role.id),
        )
        .await;

    Ok(Json(role))
}

pub async fn delete_role(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::RolesManage)?;
    state.roles.delete(&id, ctx.family_id()).await?;
    state
        .audit
        .record(AuditAction::RoleDeleted, ctx.member_id(), ctx.family_id(), Some(&id))
        .await;

    Ok(StatusCode::NO_CONTENT)
}
