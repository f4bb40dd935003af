//! Closed permission taxonomy.
//!
//! Permissions travel as `"<resource>:<action>"` strings on the wire and in
//! the store, but inside the service they are always [`Permission`] values, so
//! an unknown token is rejected when a role is built, never silently ignored
//! at check time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Permission {
    #[serde(rename = "dashboard:view")]
    DashboardView,
    #[serde(rename = "expenses:view")]
    ExpensesView,
    #[serde(rename = "expenses:create")]
    ExpensesCreate,
    #[serde(rename = "expenses:edit")]
    ExpensesEdit,
    #[serde(rename = "expenses:delete")]
    ExpensesDelete,
    #[serde(rename = "income:view")]
    IncomeView,
    #[serde(rename = "income:create")]
    IncomeCreate,
    #[serde(rename = "income:edit")]
    IncomeEdit,
    #[serde(rename = "income:delete")]
    IncomeDelete,
    #[serde(rename = "approvals:request")]
    ApprovalsRequest,
    #[serde(rename = "approvals:manage")]
    ApprovalsManage,
    #[serde(rename = "budgets:view")]
    BudgetsView,
    #[serde(rename = "budgets:manage")]
    BudgetsManage,
    #[serde(rename = "categories:view")]
    CategoriesView,
    #[serde(rename = "categories:create")]
    CategoriesCreate,
    #[serde(rename = "categories:edit")]
    CategoriesEdit,
    #[serde(rename = "categories:delete")]
    CategoriesDelete,
    #[serde(rename = "members:view")]
    MembersView,
    #[serde(rename = "members:create")]
    MembersCreate,
    #[serde(rename = "members:edit")]
    MembersEdit,
    #[serde(rename = "members:delete")]
    MembersDelete,
    #[serde(rename = "roles:manage")]
    RolesManage,
    #[serde(rename = "calendar:view")]
    CalendarView,
    #[serde(rename = "audit:view")]
    AuditView,
    #[serde(rename = "subscriptions:manage")]
    SubscriptionsManage,
    #[serde(rename = "trips:view")]
    TripsView,
    #[serde(rename = "trips:create")]
    TripsCreate,
    #[serde(rename = "trips:manage")]
    TripsManage,
}

/// Display grouping for the admin UI. Carries no runtime meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionGroup {
    Dashboard,
    Expenses,
    Income,
    Approvals,
    Budgets,
    Categories,
    Members,
    Roles,
    Calendar,
    Audit,
    Subscriptions,
    Trips,
}

impl Permission {
    pub const ALL: [Permission; 28] = [
        Permission::DashboardView,
        Permission::ExpensesView,
        Permission::ExpensesCreate,
        Permission::ExpensesEdit,
        Permission::ExpensesDelete,
        Permission::IncomeView,
        Permission::IncomeCreate,
        Permission::IncomeEdit,
        Permission::IncomeDelete,
        Permission::ApprovalsRequest,
        Permission::ApprovalsManage,
        Permission::BudgetsView,
        Permission::BudgetsManage,
        Permission::CategoriesView,
        Permission::CategoriesCreate,
        Permission::CategoriesEdit,
        Permission::CategoriesDelete,
        Permission::MembersView,
        Permission::MembersCreate,
        Permission::MembersEdit,
        Permission::MembersDelete,
        Permission::RolesManage,
        Permission::CalendarView,
        Permission::AuditView,
        Permission::SubscriptionsManage,
        Permission::TripsView,
        Permission::TripsCreate,
        Permission::TripsManage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::DashboardView => "dashboard:view",
            Permission::ExpensesView => "expenses:view",
            Permission::ExpensesCreate => "expenses:create",
            Permission::ExpensesEdit => "expenses:edit",
            Permission::ExpensesDelete => "expenses:delete",
            Permission::IncomeView => "income:view",
            Permission::IncomeCreate => "income:create",
            Permission::IncomeEdit => "income:edit",
            Permission::IncomeDelete => "income:delete",
            Permission::ApprovalsRequest => "approvals:request",
            Permission::ApprovalsManage => "approvals:manage",
            Permission::BudgetsView => "budgets:view",
            Permission::BudgetsManage => "budgets:manage",
            Permission::CategoriesView => "categories:view",
            Permission::CategoriesCreate => "categories:create",
            Permission::CategoriesEdit => "categories:edit",
            Permission::CategoriesDelete => "categories:delete",
            Permission::MembersView => "members:view",
            Permission::MembersCreate => "members:create",
            Permission::MembersEdit => "members:edit",
            Permission::MembersDelete => "members:delete",
            Permission::RolesManage => "roles:manage",
            Permission::CalendarView => "calendar:view",
            Permission::AuditView => "audit:view",
            Permission::SubscriptionsManage => "subscriptions:manage",
            Permission::TripsView => "trips:view",
            Permission::TripsCreate => "trips:create",
            Permission::TripsManage => "trips:manage",
        }
    }

    /// Exhaustive on purpose: a new variant does not compile until it is
    /// placed in the catalog.
    pub fn group(&self) -> PermissionGroup {
        match self {
            Permission::DashboardView => PermissionGroup::Dashboard,
            Permission::ExpensesView
            | Permission::ExpensesCreate
            | Permission::ExpensesEdit
            | Permission::ExpensesDelete => PermissionGroup::Expenses,
            Permission::IncomeView
            | Permission::IncomeCreate
            | Permission::IncomeEdit
            | Permission::IncomeDelete => PermissionGroup::Income,
            Permission::ApprovalsRequest | Permission::ApprovalsManage => {
                PermissionGroup::Approvals
            }
            Permission::BudgetsView | Permission::BudgetsManage => PermissionGroup::Budgets,
            Permission::CategoriesView
            | Permission::CategoriesCreate
            | Permission::CategoriesEdit
            | Permission::CategoriesDelete => PermissionGroup::Categories,
            Permission::MembersView
            | Permission::MembersCreate
            | Permission::MembersEdit
            | Permission::MembersDelete => PermissionGroup::Members,
            Permission::RolesManage => PermissionGroup::Roles,
            Permission::CalendarView => PermissionGroup::Calendar,
            Permission::AuditView => PermissionGroup::Audit,
            Permission::SubscriptionsManage => PermissionGroup::Subscriptions,
            Permission::TripsView | Permission::TripsCreate | Permission::TripsManage => {
                PermissionGroup::Trips
            }
        }
    }

    pub fn all() -> PermissionSet {
        Permission::ALL.into_iter().collect()
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPermission(pub String);

impl fmt::Display for UnknownPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown permission: {}", self.0)
    }
}

impl std::error::Error for UnknownPermission {}

impl FromStr for Permission {
    type Err = UnknownPermission;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| UnknownPermission(s.to_string()))
    }
}

/// A role's permissions: deduplicated and order-independent.
pub type PermissionSet = BTreeSet<Permission>;

/// One display group of the catalog returned to admins.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionCatalogGroup {
    pub group: PermissionGroup,
    pub permissions: Vec<Permission>,
}

pub fn permission_catalog() -> Vec<PermissionCatalogGroup> {
    let mut groups: Vec<PermissionCatalogGroup> = Vec::new();
    for permission in Permission::ALL {
        let group = permission.group();
        match groups.iter_mut().find(|g| g.group == group) {
            Some(existing) => existing.permissions.push(permission),
            None => groups.push(PermissionCatalogGroup {
                group,
                permissions: vec![permission],
            }),
        }
    }
    groups
}
