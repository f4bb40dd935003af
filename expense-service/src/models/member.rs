use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::utils::PasswordHashString;

/// A human account.
///
/// `password_hash` only ever holds the output of the argon2 hasher, since
/// `PasswordHashString` has no public constructor. It is replaced through
/// `CredentialStore::set_password`, which raises `credential_touched`; a save
/// without that flag keeps the persisted hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: PasswordHashString,
    pub role_id: String,
    /// `None` only for the system administrator.
    pub family_id: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub social_links: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub credential_touched: bool,
}

impl Member {
    pub fn new(
        name: String,
        email: String,
        password_hash: PasswordHashString,
        role_id: String,
        family_id: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            password_hash,
            role_id,
            family_id,
            phone: None,
            address: None,
            social_links: BTreeMap::new(),
            created_at: now,
            updated_at: now,
            credential_touched: true,
        }
    }

    pub fn sanitized(&self) -> MemberResponse {
        MemberResponse::from(self)
    }
}

/// Member as returned over the API: no credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role_id: String,
    pub family_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub social_links: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Member> for MemberResponse {
    fn from(member: &Member) -> Self {
        Self {
            id: member.id.clone(),
            name: member.name.clone(),
            email: member.email.clone(),
            role_id: member.role_id.clone(),
            family_id: member.family_id.clone(),
            phone: member.phone.clone(),
            address: member.address.clone(),
            social_links: member.social_links.clone(),
            created_at: member.created_at,
            updated_at: member.updated_at,
        }
    }
}
