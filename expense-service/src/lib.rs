pub mod config;
pub mod dtos;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use service_core::axum::{
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post},
    Router,
};
use service_core::middleware::{
    create_ip_rate_limiter, ip_rate_limit_middleware, metrics_middleware, request_id_middleware,
    security_headers_middleware, IpRateLimiter, REQUEST_ID_HEADER,
};
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{ExpenseConfig, StoreBackend};
use crate::services::{
    AuditTrail, AuthService, CredentialStore, Database, JwtService, MemberService, RoleRegistry,
};
use service_core::error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub config: ExpenseConfig,
    pub db: Database,
    pub jwt: JwtService,
    pub credentials: CredentialStore,
    pub roles: RoleRegistry,
    pub audit: AuditTrail,
    pub auth_service: AuthService,
    pub member_service: MemberService,
    pub login_rate_limiter: IpRateLimiter,
    pub register_rate_limiter: IpRateLimiter,
}

impl AppState {
    /// Wire every service over the given stores.
    pub fn new(config: ExpenseConfig, db: Database) -> Self {
        let jwt = JwtService::new(&config.jwt);
        let credentials = CredentialStore::new(db.members.clone());
        let roles = RoleRegistry::new(db.roles.clone(), db.members.clone());
        let audit = AuditTrail::new(db.audit_logs.clone());

        let auth_service = AuthService::new(
            db.clone(),
            credentials.clone(),
            roles.clone(),
            jwt.clone(),
            audit.clone(),
            Duration::from_millis(config.store.timeout_ms),
        );
        let member_service = MemberService::new(
            db.members.clone(),
            credentials.clone(),
            roles.clone(),
            audit.clone(),
        );

        let login_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.login_attempts,
            config.rate_limit.login_window_seconds,
            config.rate_limit.trust_forwarded_for,
        );
        let register_rate_limiter = create_ip_rate_limiter(
            config.rate_limit.register_attempts,
            config.rate_limit.register_window_seconds,
            config.rate_limit.trust_forwarded_for,
        );

        Self {
            config,
            db,
            jwt,
            credentials,
            roles,
            audit,
            auth_service,
            member_service,
            login_rate_limiter,
            register_rate_limiter,
        }
    }
}

pub fn build_router(state: AppState) -> Result<Router, AppError> {
    let login_route = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .layer(from_fn_with_state(
            state.login_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let register_route = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .layer(from_fn_with_state(
            state.register_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let protected = Router::new()
        .route(
            "/auth/me",
            get(handlers::auth::get_me).patch(handlers::auth::update_me),
        )
        .route("/auth/me/password", post(handlers::auth::change_password))
        .route(
            "/members",
            get(handlers::members::list_members).post(handlers::members::create_member),
        )
        .route(
            "/members/:id",
            get(handlers::members::get_member)
                .patch(handlers::members::update_member)
                .delete(handlers::members::delete_member),
        )
        .route(
            "/roles",
            get(handlers::roles::list_roles).post(handlers::roles::create_role),
        )
        .route("/roles/permissions", get(handlers::roles::list_permissions))
        .route(
            "/roles/:id",
            patch(handlers::roles::update_role).delete(handlers::roles::delete_role),
        )
        .route(
            "/categories",
            get(handlers::categories::list_categories)
                .post(handlers::categories::create_category),
        )
        .route(
            "/categories/:id",
            patch(handlers::categories::update_category)
                .delete(handlers::categories::delete_category),
        )
        .route(
            "/transactions",
            get(handlers::transactions::list_transactions)
                .post(handlers::transactions::create_transaction),
        )
        .route(
            "/transactions/:id",
            get(handlers::transactions::get_transaction)
                .patch(handlers::transactions::update_transaction)
                .delete(handlers::transactions::delete_transaction),
        )
        .route(
            "/budgets",
            get(handlers::budgets::list_budgets).post(handlers::budgets::create_budget),
        )
        .route(
            "/budgets/:id",
            patch(handlers::budgets::update_budget).delete(handlers::budgets::delete_budget),
        )
        .route(
            "/trips",
            get(handlers::trips::list_trips).post(handlers::trips::create_trip),
        )
        .route(
            "/trips/:id",
            get(handlers::trips::get_trip)
                .patch(handlers::trips::update_trip)
                .delete(handlers::trips::delete_trip),
        )
        .route(
            "/subscriptions",
            get(handlers::subscriptions::list_subscriptions)
                .post(handlers::subscriptions::create_subscription),
        )
        .route(
            "/subscriptions/:id",
            patch(handlers::subscriptions::update_subscription)
                .delete(handlers::subscriptions::delete_subscription),
        )
        .route(
            "/approvals",
            get(handlers::approvals::list_approvals).post(handlers::approvals::create_approval),
        )
        .route(
            "/approvals/:id/status",
            patch(handlers::approvals::update_approval_status),
        )
        .route("/dashboard", get(handlers::dashboard::get_dashboard))
        .route("/audit", get(handlers::audit::list_audit_entries))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ));

    let cors = cors_layer(&state.config)?;

    let app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route("/setup/status", get(handlers::setup::setup_status))
        .route("/setup/create-admin", post(handlers::setup::create_admin))
        .merge(login_route)
        .merge(register_route)
        .merge(protected)
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(
            |request: &service_core::axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    member_id = tracing::field::Empty,
                )
            },
        ))
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors);

    Ok(app)
}

fn cors_layer(config: &ExpenseConfig) -> Result<CorsLayer, AppError> {
    let origins = config
        .security
        .allowed_origins
        .iter()
        .map(|origin| {
            origin.parse::<HeaderValue>().map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Invalid CORS origin '{}': {}", origin, e))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]))
}

pub async fn health_check(
    service_core::axum::extract::State(state): service_core::axum::extract::State<AppState>,
) -> Result<service_core::axum::Json<serde_json::Value>, AppError> {
    state.db.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Store health check failed");
        e
    })?;

    let backend = match state.config.store.backend {
        StoreBackend::Mongodb => "mongodb",
        StoreBackend::Memory => "memory",
    };

    Ok(service_core::axum::Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "store": backend
        }
    })))
}
