use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use mongodb::bson::doc;
use serde::Deserialize;
use service_core::error::AppError;

use super::{categories::family_category, find_scoped};
use crate::{
    dtos::resources::{CreateTransactionRequest, UpdateTransactionRequest},
    middleware::AuthUser,
    models::{Permission, Transaction, TransactionKind},
    services::{require, require_any, AuthContext, ServiceError},
    utils::ValidatedJson,
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct TransactionQuery {
    pub kind: Option<TransactionKind>,
    pub category_id: Option<String>,
    pub trip_id: Option<String>,
}

/// Category must be the caller's and of the same kind as the transaction.
async fn check_category(
    state: &AppState,
    family_id: &str,
    category_id: &str,
    kind: TransactionKind,
) -> Result<(), ServiceError> {
    let category = family_category(state, family_id, category_id).await?;
    if category.kind != kind {
        return Err(ServiceError::Validation(format!(
            "Category '{}' is not an {} category",
            category.name,
            kind.as_str()
        )));
    }
    Ok(())
}

async fn check_trip(state: &AppState, family_id: &str, trip_id: &str) -> Result<(), ServiceError> {
    let found = state
        .db
        .trips
        .count(doc! { "_id": trip_id, "family_id": family_id })
        .await?;
    if found == 0 {
        return Err(ServiceError::Validation("Unknown trip".to_string()));
    }
    Ok(())
}

/// Rows are limited to the kinds the caller may view.
pub async fn list_transactions(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Query(query): Query<TransactionQuery>,
) -> Result<impl IntoResponse, AppError> {
    require_any(&ctx, &[Permission::ExpensesView, Permission::IncomeView])?;

    let mut filter = ctx.scope(doc! {});
    if let Some(kind) = query.kind {
        filter.insert("kind", kind.as_str());
    }
    if let Some(category_id) = query.category_id {
        filter.insert("category_id", category_id);
    }
    if let Some(trip_id) = query.trip_id {
        filter.insert("trip_id", trip_id);
    }

    let mut rows: Vec<Transaction> = state
        .db
        .transactions
        .find(filter)
        .await
        .map_err(ServiceError::from)?
        .into_iter()
        .filter(|t| ctx.has(t.kind.view_permission()))
        .collect();
    rows.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.created_at.cmp(&a.created_at)));

    Ok(Json(rows))
}

async fn visible_transaction(
    state: &AppState,
    ctx: &AuthContext,
    id: &str,
) -> Result<Transaction, ServiceError> {
    let transaction = find_scoped(state.db.transactions.as_ref(), ctx, id, "Transaction").await?;
    require(ctx, transaction.kind.view_permission())?;
    Ok(transaction)
}

pub async fn get_transaction(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(visible_transaction(&state, &ctx, &id).await?))
}

pub async fn create_transaction(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateTransactionRequest>,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, req.kind.create_permission())?;
    let family_id = ctx.require_family()?;

    check_category(&state, family_id, &req.category_id, req.kind).await?;
    if let Some(trip_id) = &req.trip_id {
        check_trip(&state, family_id, trip_id).await?;
    }

    let transaction = Transaction::new(
        family_id.to_string(),
        req.kind,
        req.amount,
        req.description.trim().to_string(),
        req.category_id,
        req.date,
        req.trip_id,
        ctx.member_id().to_string(),
    );
    state
        .db
        .transactions
        .insert_one(&transaction)
        .await
        .map_err(ServiceError::from)?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

pub async fn update_transaction(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateTransactionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut transaction =
        find_scoped(state.db.transactions.as_ref(), &ctx, &id, "Transaction").await?;
    require(&ctx, transaction.kind.edit_permission())?;

    if let Some(category_id) = req.category_id {
        check_category(&state, &transaction.family_id, &category_id, transaction.kind).await?;
        transaction.category_id = category_id;
    }
    if let Some(trip_id) = req.trip_id {
        check_trip(&state, &transaction.family_id, &trip_id).await?;
        transaction.trip_id = Some(trip_id);
    }
    if let Some(amount) = req.amount {
        transaction.amount = amount;
    }
    if let Some(description) = req.description {
        transaction.description = description.trim().to_string();
    }
    if let Some(date) = req.date {
        transaction.date = date;
    }
    transaction.updated_at = Utc::now();

    state
        .db
        .transactions
        .replace_one(doc! { "_id": transaction.id.as_str() }, &transaction)
        .await
        .map_err(ServiceError::from)?;

    Ok(Json(transaction))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let transaction =
        find_scoped(state.db.transactions.as_ref(), &ctx, &id, "Transaction").await?;
    require(&ctx, transaction.kind.delete_permission())?;

    state
        .db
        .transactions
        .delete_many(doc! { "_id": transaction.id.as_str() })
        .await
        .map_err(ServiceError::from)?;

    Ok(StatusCode::NO_CONTENT)
}
