use mongodb::bson::doc;
use std::sync::Arc;

use super::error::ServiceError;
use super::guard::scoped;
use super::store::DocumentStore;
use crate::models::{AuditAction, AuditEntry};

/// Append-only record of security-relevant actions. A failed write is logged
/// and never fails the request that triggered it.
#[derive(Clone)]
pub struct AuditTrail {
    logs: Arc<dyn DocumentStore<AuditEntry>>,
}

impl AuditTrail {
    pub fn new(logs: Arc<dyn DocumentStore<AuditEntry>>) -> Self {
        Self { logs }
    }

    pub async fn record(
        &self,
        action: AuditAction,
        actor_id: &str,
        family_id: Option<&str>,
        target_id: Option<&str>,
    ) {
        let entry = AuditEntry::new(action, actor_id, family_id, target_id);
        if let Err(e) = self.logs.insert_one(&entry).await {
            tracing::error!(
                error = %e,
                action = ?action,
                actor_id = %actor_id,
                "Failed to write audit entry"
            );
        }
    }

    /// Newest first.
    pub async fn list(&self, family_id: Option<&str>) -> Result<Vec<AuditEntry>, ServiceError> {
        let mut entries = self.logs.find(scoped(doc! {}, family_id)).await?;
        entries.sort_by(|a, b| b.at.cmp(&a.at));
        Ok(entries)
    }
}
