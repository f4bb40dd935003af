use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Login,
    FamilyRegistered,
    SystemBootstrapped,
    MemberCreated,
    MemberUpdated,
    MemberDeleted,
    PasswordChanged,
    RoleCreated,
    RoleUpdated,
    RoleDeleted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    #[serde(rename = "_id")]
    pub id: String,
    pub action: AuditAction,
    pub actor_id: String,
    pub family_id: Option<String>,
    pub target_id: Option<String>,
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        action: AuditAction,
        actor_id: &str,
        family_id: Option<&str>,
        target_id: Option<&str>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            action,
            actor_id: actor_id.to_string(),
            family_id: family_id.map(str::to_string),
            target_id: target_id.map(str::to_string),
            at: Utc::now(),
        }
    }
}
