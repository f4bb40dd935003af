//! Declarative authorization checks used by the route handlers.

use mongodb::bson::Document;

use super::error::ServiceError;
use crate::models::{Member, Permission, PermissionSet, Role, Trip};

/// Request-scoped caller state, rebuilt from the store on every request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub member: Member,
    pub role: Role,
    pub permissions: PermissionSet,
}

impl AuthContext {
    pub fn new(member: Member, role: Role) -> Self {
        let permissions = role.permissions.clone();
        Self {
            member,
            role,
            permissions,
        }
    }

    pub fn member_id(&self) -> &str {
        &self.member.id
    }

    /// `None` for the system administrator.
    pub fn family_id(&self) -> Option<&str> {
        self.member.family_id.as_deref()
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }

    /// Restrict a filter to the caller's family. The administrator is
    /// unrestricted.
    pub fn scope(&self, filter: Document) -> Document {
        scoped(filter, self.family_id())
    }

    /// Family to stamp on newly created resources.
    pub fn require_family(&self) -> Result<&str, ServiceError> {
        self.family_id().ok_or(ServiceError::FamilyRequired)
    }
}

pub fn scoped(mut filter: Document, family_id: Option<&str>) -> Document {
    if let Some(family_id) = family_id {
        filter.insert("family_id", family_id);
    }
    filter
}

pub fn require(ctx: &AuthContext, permission: Permission) -> Result<(), ServiceError> {
    if ctx.has(permission) {
        return Ok(());
    }
    deny(ctx, permission.as_str().to_string())
}

pub fn require_any(ctx: &AuthContext, permissions: &[Permission]) -> Result<(), ServiceError> {
    if permissions.iter().any(|p| ctx.has(*p)) {
        return Ok(());
    }
    let wanted = permissions
        .iter()
        .map(Permission::as_str)
        .collect::<Vec<_>>()
        .join(" or ");
    deny(ctx, wanted)
}

fn deny(ctx: &AuthContext, wanted: String) -> Result<(), ServiceError> {
    tracing::debug!(member_id = %ctx.member.id, permission = %wanted, "Permission denied");
    metrics::counter!("authz_denied_total", "code" => "forbidden").increment(1);
    Err(ServiceError::Forbidden(wanted))
}

/// A resource with a creator who may act on it without the blanket permission.
pub trait Owned {
    fn owner_id(&self) -> &str;
}

impl Owned for Trip {
    fn owner_id(&self) -> &str {
        &self.created_by
    }
}

/// `manage` permission OR ownership of the resource.
pub fn can_act<R: Owned>(ctx: &AuthContext, manage: Permission, resource: &R) -> bool {
    ctx.has(manage) || resource.owner_id() == ctx.member.id
}

pub fn require_can_act<R: Owned>(
    ctx: &AuthContext,
    manage: Permission,
    resource: &R,
) -> Result<(), ServiceError> {
    if can_act(ctx, manage, resource) {
        return Ok(());
    }
    deny(ctx, format!("{} or ownership", manage.as_str()))
}
