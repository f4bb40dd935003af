use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{PermissionCatalogGroup, PermissionSet};

/// Unknown permission tokens fail deserialization, so they surface as 400.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, max = 60, message = "Role name must be 1-60 characters"))]
    pub name: String,

    pub permissions: PermissionSet,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateRoleRequest {
    #[validate(length(min = 1, max = 60, message = "Role name must be 1-60 characters"))]
    pub name: Option<String>,

    pub permissions: Option<PermissionSet>,
}

#[derive(Debug, Serialize)]
pub struct PermissionCatalogResponse {
    pub groups: Vec<PermissionCatalogGroup>,
}
