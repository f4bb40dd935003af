use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;
use std::time::Duration;

use crate::services::{with_store_timeout, AuthContext, ServiceError, SessionClaims};
use crate::AppState;

/// Per-request trust boundary for every protected route.
///
/// Verifies the bearer token, reloads the member and role from the store and
/// attaches the resulting [`AuthContext`]. Nothing beyond identity is taken
/// from the token.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| reject(ServiceError::NoToken))?
        .to_string();

    let claims = state.jwt.verify(&token).map_err(reject)?;
    let ctx = resolve_context(&state, &claims).await.map_err(reject)?;

    tracing::Span::current().record("member_id", ctx.member.id.as_str());
    req.extensions_mut().insert(ctx);

    Ok(next.run(req).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

async fn resolve_context(
    state: &AppState,
    claims: &SessionClaims,
) -> Result<AuthContext, ServiceError> {
    let limit = Duration::from_millis(state.config.store.timeout_ms);

    let member = with_store_timeout(limit, state.credentials.find_by_id(&claims.member.id))
        .await?
        .ok_or(ServiceError::StaleToken)?;

    if member.family_id != claims.member.family_id {
        tracing::warn!(member_id = %member.id, "Token family does not match member");
        return Err(ServiceError::StaleToken);
    }

    let role = with_store_timeout(limit, state.roles.find_role_for_member(&member))
        .await?
        .ok_or(ServiceError::RoleMissing)?;

    Ok(AuthContext::new(member, role))
}

fn reject(err: ServiceError) -> AppError {
    let code = match &err {
        ServiceError::NoToken => "no_token",
        ServiceError::InvalidToken => "invalid_token",
        ServiceError::StaleToken => "stale_token",
        ServiceError::RoleMissing => "role_missing",
        ServiceError::StoreTimeout => "store_unavailable",
        ServiceError::Integrity(_) => "integrity_error",
        _ => "other",
    };
    tracing::debug!(code, "Request not authorized");
    metrics::counter!("authz_denied_total", "code" => code).increment(1);
    AppError::from(err)
}

/// Extractor for the context attached by [`auth_middleware`].
pub struct AuthUser(pub AuthContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "Auth context missing from request extensions"
                ))
            })
    }
}
