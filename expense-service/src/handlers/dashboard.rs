use axum::{extract::State, response::IntoResponse, Json};
use mongodb::bson::doc;
use serde::Serialize;
use service_core::error::AppError;

use crate::{
    middleware::AuthUser,
    models::{ApprovalStatus, Permission, TransactionKind},
    services::{require, ServiceError},
    AppState,
};

/// Family overview. Totals the caller may not view are omitted rather than
/// zeroed.
#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_expenses: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_income: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_approvals: Option<u64>,
    pub members: u64,
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::DashboardView)?;

    let transactions = state
        .db
        .transactions
        .find(ctx.scope(doc! {}))
        .await
        .map_err(ServiceError::from)?;
    let total = |kind: TransactionKind| {
        ctx.has(kind.view_permission()).then(|| {
            transactions
                .iter()
                .filter(|t| t.kind == kind)
                .map(|t| t.amount)
                .sum::<f64>()
        })
    };

    let pending_approvals = if ctx.has(Permission::ApprovalsManage) {
        let filter = ctx.scope(doc! { "status": ApprovalStatus::Pending.as_str() });
        Some(
            state
                .db
                .approvals
                .count(filter)
                .await
                .map_err(ServiceError::from)?,
        )
    } else {
        None
    };

    let members = state
        .db
        .members
        .count(ctx.scope(doc! {}))
        .await
        .map_err(ServiceError::from)?;

    Ok(Json(DashboardSummary {
        total_expenses: total(TransactionKind::Expense),
        total_income: total(TransactionKind::Income),
        pending_approvals,
        members,
    }))
}
