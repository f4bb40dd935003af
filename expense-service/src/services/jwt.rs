use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use super::error::ServiceError;
use crate::config::JwtConfig;
use crate::models::Member;

/// Identity carried in a session token. Permissions are never embedded; they
/// are resolved from the store on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberClaim {
    pub id: String,
    #[serde(rename = "familyId")]
    pub family_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub member: MemberClaim,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Issues and verifies HS256 session tokens. Stateless.
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    expiry_hours: i64,
}

impl JwtService {
    pub fn new(config: &JwtConfig) -> Self {
        let secret = config.secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.required_spec_claims = ["exp", "iat"].iter().map(|s| s.to_string()).collect();

        tracing::info!(expiry_hours = config.expiry_hours, "JWT service initialized with HS256");

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            expiry_hours: config.expiry_hours,
        }
    }

    /// Token lifetime in seconds, as reported to clients.
    pub fn expires_in(&self) -> i64 {
        self.expiry_hours * 3600
    }

    pub fn issue(&self, member: &Member) -> Result<String, ServiceError> {
        self.issue_at(member, Utc::now())
    }

    /// Issue a token as if the clock read `now`. Expiry is fixed from issuance.
    pub fn issue_at(&self, member: &Member, now: DateTime<Utc>) -> Result<String, ServiceError> {
        let claims = SessionClaims {
            member: MemberClaim {
                id: member.id.clone(),
                family_id: member.family_id.clone(),
            },
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.expiry_hours)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Failed to encode token: {}", e)))
    }

    /// Check signature and expiry. Business rules such as family consistency
    /// are left to the authorization middleware.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, ServiceError> {
        decode::<SessionClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Token verification failed");
                ServiceError::InvalidToken
            })
    }
}
