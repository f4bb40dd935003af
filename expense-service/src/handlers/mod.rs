pub mod approvals;
pub mod audit;
pub mod auth;
pub mod budgets;
pub mod categories;
pub mod dashboard;
pub mod members;
pub mod metrics;
pub mod roles;
pub mod setup;
pub mod subscriptions;
pub mod transactions;
pub mod trips;

use mongodb::bson::doc;

use crate::services::{AuthContext, DocumentStore, ServiceError};

/// Load one resource by id inside the caller's family. A row that exists in
/// another family is reported exactly like a missing one.
pub(crate) async fn find_scoped<T>(
    store: &dyn DocumentStore<T>,
    ctx: &AuthContext,
    id: &str,
    what: &'static str,
) -> Result<T, ServiceError> {
    store
        .find_one(ctx.scope(doc! { "_id": id }))
        .await?
        .ok_or(ServiceError::NotFound(what))
}
