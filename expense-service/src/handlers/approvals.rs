use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use mongodb::bson::doc;
use service_core::error::AppError;

use super::find_scoped;
use crate::{
    dtos::resources::{CreateApprovalRequest, UpdateApprovalStatusRequest},
    middleware::AuthUser,
    models::{ApprovalRequest, Permission},
    services::{require, require_any, ServiceError},
    utils::ValidatedJson,
    AppState,
};

/// Managers see every request in the family; everyone else sees their own.
pub async fn list_approvals(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    require_any(&ctx, &[Permission::ApprovalsManage, Permission::ApprovalsRequest])?;

    let mut filter = ctx.scope(doc! {});
    if !ctx.has(Permission::ApprovalsManage) {
        filter.insert("requested_by", ctx.member_id());
    }

    let mut approvals = state
        .db
        .approvals
        .find(filter)
        .await
        .map_err(ServiceError::from)?;
    approvals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(approvals))
}

pub async fn create_approval(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateApprovalRequest>,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::ApprovalsRequest)?;
    let family_id = ctx.require_family()?;

    let approval = ApprovalRequest::new(
        family_id.to_string(),
        ctx.member_id().to_string(),
        req.amount,
        req.description.trim().to_string(),
    );
    state
        .db
        .approvals
        .insert_one(&approval)
        .await
        .map_err(ServiceError::from)?;

    Ok((StatusCode::CREATED, Json(approval)))
}

pub async fn update_approval_status(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateApprovalStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::ApprovalsManage)?;
    let mut approval = find_scoped(state.db.approvals.as_ref(), &ctx, &id, "Approval").await?;

    if !approval.status.can_transition_to(req.status) {
        return Err(ServiceError::InvalidTransition {
            from: approval.status.as_str().to_string(),
            to: req.status.as_str().to_string(),
        }
        .into());
    }

    approval.status = req.status;
    approval.decided_by = Some(ctx.member_id().to_string());
    approval.updated_at = Utc::now();

    state
        .db
        .approvals
        .replace_one(doc! { "_id": approval.id.as_str() }, &approval)
        .await
        .map_err(ServiceError::from)?;

    tracing::info!(
        approval_id = %approval.id,
        actor_id = %ctx.member_id(),
        status = approval.status.as_str(),
        "Approval decided"
    );
    Ok(Json(approval))
}
