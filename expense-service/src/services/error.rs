use service_core::error::AppError;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use super::store::StoreError;

/// Domain failures. The HTTP status for each is fixed by the
/// `From<ServiceError> for AppError` impl below.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Missing or malformed bearer token")]
    NoToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Token no longer matches the account")]
    StaleToken,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Missing permission: {0}")]
    Forbidden(String),

    #[error("Role assigned to this account no longer exists")]
    RoleMissing,

    #[error("System is already initialized")]
    AlreadyInitialized,

    #[error("Members cannot delete themselves")]
    CannotDeleteSelf,

    #[error("Members cannot change their own role")]
    CannotChangeOwnRole,

    #[error("{0}")]
    Validation(String),

    #[error("This action requires a family account")]
    FamilyRequired,

    #[error("Cannot move request from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Data integrity violation: {0}")]
    Integrity(String),

    #[error("Role is still assigned to members")]
    RoleInUse,

    #[error("Email is already registered")]
    EmailTaken,

    #[error("Category is still referenced")]
    CategoryInUse,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(&'static str),

    #[error("Store did not answer in time")]
    StoreTimeout,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Bound a store round-trip. A slow store is a 503, never a 401.
pub async fn with_store_timeout<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T, ServiceError>>,
) -> Result<T, ServiceError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| ServiceError::StoreTimeout)?
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::NoToken => AppError::unauthorized("no_token", message),
            ServiceError::InvalidToken => AppError::unauthorized("invalid_token", message),
            ServiceError::StaleToken => AppError::unauthorized("stale_token", message),
            ServiceError::InvalidCredentials => {
                AppError::unauthorized("invalid_credentials", message)
            }
            ServiceError::Forbidden(_) => AppError::forbidden("forbidden", message),
            ServiceError::RoleMissing => AppError::forbidden("role_missing", message),
            ServiceError::AlreadyInitialized => {
                AppError::forbidden("already_initialized", message)
            }
            ServiceError::CannotDeleteSelf => AppError::forbidden("cannot_delete_self", message),
            ServiceError::CannotChangeOwnRole => {
                AppError::forbidden("cannot_change_own_role", message)
            }
            ServiceError::Validation(_) => AppError::bad_request("validation_error", message),
            ServiceError::FamilyRequired => AppError::bad_request("family_required", message),
            ServiceError::InvalidTransition { .. } => {
                AppError::bad_request("invalid_transition", message)
            }
            ServiceError::Integrity(detail) => AppError::IntegrityError(anyhow::anyhow!(detail)),
            ServiceError::RoleInUse => AppError::conflict("role_in_use", message),
            ServiceError::EmailTaken => AppError::conflict("email_taken", message),
            ServiceError::CategoryInUse => AppError::conflict("category_in_use", message),
            ServiceError::Conflict(_) => AppError::conflict("conflict", message),
            ServiceError::NotFound(what) => AppError::NotFound(what.to_string()),
            ServiceError::StoreTimeout => AppError::ServiceUnavailable(message),
            ServiceError::Store(StoreError::DuplicateKey(_)) => {
                AppError::conflict("conflict", "Resource already exists")
            }
            ServiceError::Store(StoreError::Unavailable(reason)) => {
                AppError::ServiceUnavailable(reason)
            }
            ServiceError::Store(other) => AppError::DatabaseError(anyhow::Error::new(other)),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
