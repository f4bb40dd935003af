use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::permission::{Permission, PermissionSet};

/// Fixed id of the global, family-less administrator role.
pub const SYSTEM_ADMIN_ROLE_ID: &str = "system-administrator";
pub const SYSTEM_ADMIN_ROLE_NAME: &str = "System Administrator";

/// Named permission set scoped to a family, or global for the administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub permissions: PermissionSet,
    pub family_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn new(name: String, permissions: PermissionSet, family_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            permissions,
            family_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn system_administrator() -> Self {
        let now = Utc::now();
        Self {
            id: SYSTEM_ADMIN_ROLE_ID.to_string(),
            name: SYSTEM_ADMIN_ROLE_NAME.to_string(),
            permissions: Permission::all(),
            family_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Starter roles seeded into every new family. The first entry is the head
/// role bound to the registering member.
pub fn starter_roles() -> Vec<(&'static str, PermissionSet)> {
    use Permission::*;

    let head = Permission::all();

    let manager: PermissionSet = Permission::all()
        .into_iter()
        .filter(|p| !matches!(p, MembersCreate | MembersEdit | MembersDelete | RolesManage | AuditView))
        .collect();

    let member: PermissionSet = [
        DashboardView,
        ExpensesView,
        ExpensesCreate,
        IncomeView,
        ApprovalsRequest,
        BudgetsView,
        CategoriesView,
        MembersView,
        CalendarView,
        TripsView,
        TripsCreate,
    ]
    .into_iter()
    .collect();

    vec![("Head", head), ("Manager", manager), ("Member", member)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starter_roles() {
        let roles = starter_roles();
        assert_eq!(roles[0].0, "Head");
        assert_eq!(roles[0].1, Permission::all());

        let manager = &roles[1].1;
        assert!(manager.contains(&Permission::ApprovalsManage));
        assert!(!manager.contains(&Permission::RolesManage));
        assert!(!manager.contains(&Permission::MembersDelete));

        let member = &roles[2].1;
        assert!(member.contains(&Permission::ExpensesCreate));
        assert!(!member.contains(&Permission::MembersDelete));
        assert!(!member.contains(&Permission::ExpensesDelete));
    }

    #[test]
    fn test_system_administrator_is_global() {
        let role = Role::system_administrator();
        assert_eq!(role.id, SYSTEM_ADMIN_ROLE_ID);
        assert!(role.family_id.is_none());
        assert_eq!(role.permissions.len(), Permission::ALL.len());
    }
}
