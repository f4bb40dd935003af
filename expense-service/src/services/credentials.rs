use chrono::Utc;
use mongodb::bson::doc;
use std::sync::Arc;

use super::error::ServiceError;
use super::store::{DocumentStore, StoreError};
use crate::models::Member;
use crate::utils::{
    hash_password, normalize_email, validate_password, verify_password, Password,
    PasswordHashString,
};

/// Member identity and password lifecycle.
#[derive(Clone)]
pub struct CredentialStore {
    members: Arc<dyn DocumentStore<Member>>,
}

impl CredentialStore {
    pub fn new(members: Arc<dyn DocumentStore<Member>>) -> Self {
        Self { members }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Member>, ServiceError> {
        Ok(self.members.find_one(doc! { "_id": id }).await?)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Member>, ServiceError> {
        Ok(self
            .members
            .find_one(doc! { "email": normalize_email(email) })
            .await?)
    }

    pub async fn ensure_email_available(&self, email: &str) -> Result<(), ServiceError> {
        if self.find_by_email(email).await?.is_some() {
            return Err(ServiceError::EmailTaken);
        }
        Ok(())
    }

    /// Validate a new plaintext against the complexity policy and hash it.
    pub async fn hash_new(&self, plaintext: Password) -> Result<PasswordHashString, ServiceError> {
        validate_password(&plaintext).map_err(|e| ServiceError::Validation(e.to_string()))?;

        tokio::task::spawn_blocking(move || hash_password(&plaintext))
            .await
            .map_err(|e| ServiceError::Internal(anyhow::anyhow!("Hash task failed: {}", e)))?
            .map_err(ServiceError::Internal)
    }

    /// Replace a member's credential in memory. Nothing is hashed on a
    /// policy violation; the new hash is persisted by the next [`save`].
    ///
    /// [`save`]: CredentialStore::save
    pub async fn set_password(
        &self,
        member: &mut Member,
        plaintext: Password,
    ) -> Result<(), ServiceError> {
        member.password_hash = self.hash_new(plaintext).await?;
        member.credential_touched = true;
        Ok(())
    }

    /// Constant-time check of a plaintext against the stored hash. A mismatch
    /// is `false`, not an error.
    pub async fn verify_password(&self, member: &Member, plaintext: Password) -> bool {
        let hash = member.password_hash.clone();
        match tokio::task::spawn_blocking(move || verify_password(&plaintext, &hash)).await {
            Ok(valid) => valid,
            Err(e) => {
                tracing::error!(error = %e, "Password verification task failed");
                false
            }
        }
    }

    pub async fn insert(&self, member: &mut Member) -> Result<(), ServiceError> {
        member.email = normalize_email(&member.email);
        self.members.insert_one(member).await.map_err(|e| match e {
            StoreError::DuplicateKey(_) => ServiceError::EmailTaken,
            other => ServiceError::Store(other),
        })?;
        member.credential_touched = false;
        Ok(())
    }

    /// Persist a member. Unless [`set_password`](CredentialStore::set_password)
    /// touched the credential, the persisted hash is carried over and the
    /// in-memory one is ignored.
    pub async fn save(&self, member: &mut Member) -> Result<(), ServiceError> {
        if !member.credential_touched {
            let stored = self
                .find_by_id(&member.id)
                .await?
                .ok_or(ServiceError::NotFound("Member"))?;
            member.password_hash = stored.password_hash;
        }

        member.email = normalize_email(&member.email);
        member.updated_at = Utc::now();
        let matched = self
            .members
            .replace_one(doc! { "_id": member.id.clone() }, member)
            .await
            .map_err(|e| match e {
                StoreError::DuplicateKey(_) => ServiceError::EmailTaken,
                other => ServiceError::Store(other),
            })?;
        if !matched {
            return Err(ServiceError::NotFound("Member"));
        }
        if member.credential_touched {
            tracing::info!(member_id = %member.id, "Member credential updated");
        }
        member.credential_touched = false;
        Ok(())
    }
}
