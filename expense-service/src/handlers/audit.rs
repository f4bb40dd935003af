use axum::{extract::State, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{
    middleware::AuthUser,
    models::Permission,
    services::require,
    AppState,
};

pub async fn list_audit_entries(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> Result<impl IntoResponse, AppError> {
    require(&ctx, Permission::AuditView)?;
    Ok(Json(state.audit.list(ctx.family_id()).await?))
}
