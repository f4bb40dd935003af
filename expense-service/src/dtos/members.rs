use serde::Deserialize;
use std::collections::BTreeMap;
use validator::Validate;

/// The family is always the caller's; a `family_id` in the body is rejected.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateMemberRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,

    #[validate(length(min = 1, message = "Role is required"))]
    pub role_id: String,

    #[validate(length(max = 32))]
    pub phone: Option<String>,

    #[validate(length(max = 300))]
    pub address: Option<String>,

    pub social_links: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct UpdateMemberRequest {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    pub password: Option<String>,

    pub role_id: Option<String>,

    #[validate(length(max = 32))]
    pub phone: Option<String>,

    #[validate(length(max = 300))]
    pub address: Option<String>,

    pub social_links: Option<BTreeMap<String, String>>,
}
