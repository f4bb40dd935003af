use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use mongodb::bson::doc;
use service_core::error::AppError;

use super::find_scoped;
use crate::{
    dtos::resources::{CreateTripRequest, UpdateTripRequest},
    middleware::AuthUser,
    models::{Permission, Trip},
    services::{require, require_can_act, ServiceError},
    utils::{clean_name, ValidatedJson},
    AppState,
};

fn check_dates(start: NaiveDate, end: NaiveDate) -> Result<(), ServiceError> {
    if end < start {
        return Err(ServiceError::Validation(
            "Trip end date must not be before its start date".to_string(),
        ));
    }
    Ok(())
}

fn trip_name(name: &str) -> Result<String, ServiceError> {
    clean_name(name)
        .ok_or_else(|| ServiceError::Validation("Trip name must not be blank".to_string()))
}

pub async fn list_trips(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::TripsView)?;
    let mut trips = state
        .db
        .trips
        .find(ctx.scope(doc! {}))
        .await
        .map_err(ServiceError::from)?;
    trips.sort_by(|a, b| b.start_date.cmp(&a.start_date));
    Ok(Json(trips))
}

pub async fn get_trip(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::TripsView)?;
    Ok(Json(
        find_scoped(state.db.trips.as_ref(), &ctx, &id, "Trip").await?,
    ))
}

pub async fn create_trip(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    ValidatedJson(req): ValidatedJson<CreateTripRequest>,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::TripsCreate)?;
    let family_id = ctx.require_family()?;
    check_dates(req.start_date, req.end_date)?;

    let trip = Trip::new(
        family_id.to_string(),
        trip_name(&req.name)?,
        req.destination.and_then(|d| clean_name(&d)),
        req.start_date,
        req.end_date,
        req.budget,
        ctx.member_id().to_string(),
    );
    state
        .db
        .trips
        .insert_one(&trip)
        .await
        .map_err(ServiceError::from)?;

    Ok((StatusCode::CREATED, Json(trip)))
}

/// Creators may edit their own trips without `trips:manage`.
pub async fn update_trip(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateTripRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut trip = find_scoped(state.db.trips.as_ref(), &ctx, &id, "Trip").await?;
    require_can_act(&ctx, Permission::TripsManage, &trip)?;

    if let Some(name) = req.name {
        trip.name = trip_name(&name)?;
    }
    if let Some(destination) = req.destination {
        trip.destination = clean_name(&destination);
    }
    if let Some(start) = req.start_date {
        trip.start_date = start;
    }
    if let Some(end) = req.end_date {
        trip.end_date = end;
    }
    if req.budget.is_some() {
        trip.budget = req.budget;
    }
    check_dates(trip.start_date, trip.end_date)?;
    trip.updated_at = Utc::now();

    state
        .db
        .trips
        .replace_one(doc! { "_id": trip.id.as_str() }, &trip)
        .await
        .map_err(ServiceError::from)?;

    Ok(Json(trip))
}

/// Transactions booked against the trip are kept and detached from it.
pub async fn delete_trip(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let trip = find_scoped(state.db.trips.as_ref(), &ctx, &id, "Trip").await?;
    require_can_act(&ctx, Permission::TripsManage, &trip)?;

    let booked = state
        .db
        .transactions
        .find(doc! { "family_id": trip.family_id.as_str(), "trip_id": trip.id.as_str() })
        .await
        .map_err(ServiceError::from)?;
    for mut transaction in booked {
        transaction.trip_id = None;
        transaction.updated_at = Utc::now();
        state
            .db
            .transactions
            .replace_one(doc! { "_id": transaction.id.as_str() }, &transaction)
            .await
            .map_err(ServiceError::from)?;
    }

    state
        .db
        .trips
        .delete_many(doc! { "_id": trip.id.as_str() })
        .await
        .map_err(ServiceError::from)?;

    tracing::info!(trip_id = %trip.id, actor_id = %ctx.member_id(), "Trip deleted");
    Ok(StatusCode::NO_CONTENT)
}
