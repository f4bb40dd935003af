use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use mongodb::bson::doc;
use service_core::error::AppError;

use super::{categories::family_category, find_scoped};
use crate::{
    dtos::resources::{CreateBudgetRequest, UpdateBudgetRequest},
    middleware::AuthUser,
    models::{Budget, Permission},
    services::{require, ServiceError},
    utils::ValidatedJson,
    AppState,
};

pub async fn list_budgets(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::BudgetsView)?;
    let budgets = state
        .db
        .budgets
        .find(ctx.scope(doc! {}))
        .await
        .map_err(ServiceError::from)?;
    Ok(Json(budgets))
}

pub async fn create_budget(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateBudgetRequest>,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::BudgetsManage)?;
    let family_id = ctx.require_family()?;
    let category = family_category(&state, family_id, &req.category_id).await?;

    let existing = state
        .db
        .budgets
        .count(doc! { "family_id": family_id, "category_id": category.id.as_str() })
        .await
        .map_err(ServiceError::from)?;
    if existing > 0 {
        return Err(ServiceError::Conflict(format!(
            "Category '{}' already has a budget",
            category.name
        ))
        .into());
    }

    let budget = Budget::new(family_id.to_string(), category.id, req.amount, req.period);
    state
        .db
        .budgets
        .insert_one(&budget)
        .await
        .map_err(ServiceError::from)?;

    Ok((StatusCode::CREATED, Json(budget)))
}

pub async fn update_budget(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateBudgetRequest>,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::BudgetsManage)?;
    let mut budget = find_scoped(state.db.budgets.as_ref(), &ctx, &id, "Budget").await?;

    if let Some(amount) = req.amount {
        budget.amount = amount;
    }
    if let Some(period) = req.period {
        budget.period = period;
    }
    budget.updated_at = Utc::now();

    state
        .db
        .budgets
        .replace_one(doc! { "_id": budget.id.as_str() }, &budget)
        .await
        .map_err(ServiceError::from)?;

    Ok(Json(budget))
}

pub async fn delete_budget(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::BudgetsManage)?;
    let budget = find_scoped(state.db.budgets.as_ref(), &ctx, &id, "Budget").await?;

    state
        .db
        .budgets
        .delete_many(doc! { "_id": budget.id.as_str() })
        .await
        .map_err(ServiceError::from)?;

    Ok(StatusCode::NO_CONTENT)
}
