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
    dtos::resources::{CreateSubscriptionRequest, UpdateSubscriptionRequest},
    middleware::AuthUser,
    models::{Permission, Subscription},
    services::{require, ServiceError},
    utils::{clean_name, ValidatedJson},
    AppState,
};

fn subscription_name(name: &str) -> Result<String, ServiceError> {
    clean_name(name)
        .ok_or_else(|| ServiceError::Validation("Subscription name must not be blank".to_string()))
}

pub async fn list_subscriptions(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::SubscriptionsManage)?;
    let mut subscriptions = state
        .db
        .subscriptions
        .find(ctx.scope(doc! {}))
        .await
        .map_err(ServiceError::from)?;
    subscriptions.sort_by(|a, b| a.next_due.cmp(&b.next_due));
    Ok(Json(subscriptions))
}

pub async fn create_subscription(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateSubscriptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::SubscriptionsManage)?;
    let family_id = ctx.require_family()?;
    let category = family_category(&state, family_id, &req.category_id).await?;

    let subscription = Subscription::new(
        family_id.to_string(),
        subscription_name(&req.name)?,
        req.amount,
        req.cycle,
        req.next_due,
        category.id,
    );
    state
        .db
        .subscriptions
        .insert_one(&subscription)
        .await
        .map_err(ServiceError::from)?;

    Ok((StatusCode::CREATED, Json(subscription)))
}

pub async fn update_subscription(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateSubscriptionRequest>,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::SubscriptionsManage)?;
    let mut subscription =
        find_scoped(state.db.subscriptions.as_ref(), &ctx, &id, "Subscription").await?;

    if let Some(category_id) = req.category_id {
        let category = family_category(&state, &subscription.family_id, &category_id).await?;
        subscription.category_id = category.id;
    }
    if let Some(name) = req.name {
        subscription.name = subscription_name(&name)?;
    }
    if let Some(amount) = req.amount {
        subscription.amount = amount;
    }
    if let Some(cycle) = req.cycle {
        subscription.cycle = cycle;
    }
    if let Some(next_due) = req.next_due {
        subscription.next_due = next_due;
    }
    subscription.updated_at = Utc::now();

    state
        .db
        .subscriptions
        .replace_one(doc! { "_id": subscription.id.as_str() }, &subscription)
        .await
        .map_err(ServiceError::from)?;

    Ok(Json(subscription))
}

pub async fn delete_subscription(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::SubscriptionsManage)?;
    let subscription =
        find_scoped(state.db.subscriptions.as_ref(), &ctx, &id, "Subscription").await?;

    state
        .db
        .subscriptions
        .delete_many(doc! { "_id": subscription.id.as_str() })
        .await
        .map_err(ServiceError::from)?;

    Ok(StatusCode::NO_CONTENT)
}
