use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use mongodb::bson::doc;
use serde::Deserialize;
use service_core::error::AppError;

use super::find_scoped;
use crate::{
    dtos::resources::{CreateCategoryRequest, UpdateCategoryRequest},
    middleware::AuthUser,
    models::{Category, Permission, TransactionKind},
    services::{require, AuthContext, ServiceError},
    utils::{clean_name, ValidatedJson},
    AppState,
};

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub kind: Option<TransactionKind>,
}

/// Resolve a category referenced from a request body. It must belong to the
/// caller's family; anything else is a bad request rather than a 404.
pub(crate) async fn family_category(
    state: &AppState,
    family_id: &str,
    category_id: &str,
) -> Result<Category, ServiceError> {
    state
        .db
        .categories
        .find_one(doc! { "_id": category_id, "family_id": family_id })
        .await?
        .ok_or_else(|| ServiceError::Validation("Unknown category".to_string()))
}

async fn ensure_unique_name(
    state: &AppState,
    family_id: &str,
    name: &str,
    kind: TransactionKind,
) -> Result<(), ServiceError> {
    let existing = state
        .db
        .categories
        .count(doc! { "family_id": family_id, "name": name, "kind": kind.as_str() })
        .await?;
    if existing > 0 {
        return Err(ServiceError::Conflict(format!(
            "A {} category named '{}' already exists",
            kind.as_str(),
            name
        )));
    }
    Ok(())
}

pub async fn list_categories(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Query(query): Query<CategoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::CategoriesView)?;

    let mut filter = ctx.scope(doc! {});
    if let Some(kind) = query.kind {
        filter.insert("kind", kind.as_str());
    }
    let mut categories = state.db.categories.find(filter).await.map_err(ServiceError::from)?;
    categories.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::CategoriesCreate)?;
    let family_id = ctx.require_family()?;
    let name = clean_name(&req.name)
        .ok_or_else(|| ServiceError::Validation("Category name must not be blank".to_string()))?;

    ensure_unique_name(&state, family_id, &name, req.kind).await?;

    let category = Category::new(family_id.to_string(), name, req.kind);
    state
        .db
        .categories
        .insert_one(&category)
        .await
        .map_err(ServiceError::from)?;

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::CategoriesEdit)?;
    let mut category = find_scoped(state.db.categories.as_ref(), &ctx, &id, "Category").await?;

    if let Some(name) = req.name {
        let name = clean_name(&name).ok_or_else(|| {
            ServiceError::Validation("Category name must not be blank".to_string())
        })?;
        if name != category.name {
            ensure_unique_name(&state, &category.family_id, &name, category.kind).await?;
            category.name = name;
        }
    }

    state
        .db
        .categories
        .replace_one(doc! { "_id": category.id.as_str() }, &category)
        .await
        .map_err(ServiceError::from)?;

    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::CategoriesDelete)?;
    let category = find_scoped(state.db.categories.as_ref(), &ctx, &id, "Category").await?;

    ensure_unreferenced(&state, &ctx, &category).await?;

    state
        .db
        .categories
        .delete_many(doc! { "_id": category.id.as_str() })
        .await
        .map_err(ServiceError::from)?;

    Ok(StatusCode::NO_CONTENT)
}

async fn ensure_unreferenced(
    state: &AppState,
    ctx: &AuthContext,
    category: &Category,
) -> Result<(), ServiceError> {
    let filter = doc! { "category_id": category.id.as_str() };
    let references = state.db.transactions.count(filter.clone()).await?
        + state.db.budgets.count(filter.clone()).await?
        + state.db.subscriptions.count(filter).await?;

    if references > 0 {
        tracing::info!(
            category_id = %category.id,
            actor_id = %ctx.member_id(),
            references,
            "Refusing to delete category in use"
        );
        return Err(ServiceError::CategoryInUse);
    }
    Ok(())
}
