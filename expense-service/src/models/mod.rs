pub mod approval;
pub mod audit_log;
pub mod budget;
pub mod category;
pub mod family;
pub mod member;
pub mod permission;
pub mod role;
pub mod subscription;
pub mod transaction;
pub mod trip;

pub use approval::{ApprovalRequest, ApprovalStatus};
pub use audit_log::{AuditAction, AuditEntry};
pub use budget::{Budget, BudgetPeriod};
pub use category::{default_categories, Category};
pub use family::Family;
pub use member::{Member, MemberResponse};
pub use permission::{permission_catalog, Permission, PermissionCatalogGroup, PermissionSet};
pub use role::{starter_roles, Role, SYSTEM_ADMIN_ROLE_ID};
pub use subscription::{BillingCycle, Subscription};
pub use transaction::{Transaction, TransactionKind};
pub use trip::Trip;
