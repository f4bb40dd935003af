use mongodb::bson::doc;
use std::sync::Arc;

use super::audit::AuditTrail;
use super::credentials::CredentialStore;
use super::error::ServiceError;
use super::guard::AuthContext;
use super::roles::RoleRegistry;
use super::store::DocumentStore;
use crate::dtos::{CreateMemberRequest, UpdateMemberRequest};
use crate::models::{AuditAction, Member, MemberResponse, Role};
use crate::utils::{clean_name, normalize_email, Password};

/// Member administration inside the caller's family.
#[derive(Clone)]
pub struct MemberService {
    members: Arc<dyn DocumentStore<Member>>,
    credentials: CredentialStore,
    roles: RoleRegistry,
    audit: AuditTrail,
}

impl MemberService {
    pub fn new(
        members: Arc<dyn DocumentStore<Member>>,
        credentials: CredentialStore,
        roles: RoleRegistry,
        audit: AuditTrail,
    ) -> Self {
        Self {
            members,
            credentials,
            roles,
            audit,
        }
    }

    pub async fn list(&self, ctx: &AuthContext) -> Result<Vec<MemberResponse>, ServiceError> {
        let members = self.members.find(ctx.scope(doc! {})).await?;
        Ok(members.iter().map(MemberResponse::from).collect())
    }

    pub async fn get(&self, ctx: &AuthContext, id: &str) -> Result<Member, ServiceError> {
        self.members
            .find_one(ctx.scope(doc! { "_id": id }))
            .await?
            .ok_or(ServiceError::NotFound("Member"))
    }

    pub async fn create(
        &self,
        ctx: &AuthContext,
        req: CreateMemberRequest,
    ) -> Result<MemberResponse, ServiceError> {
        let family_id = ctx.require_family()?.to_string();
        let role = self.role_in_family(&req.role_id, Some(&family_id)).await?;

        let email = normalize_email(&req.email);
        self.credentials.ensure_email_available(&email).await?;
        let password_hash = self.credentials.hash_new(Password::new(req.password)).await?;

        let mut member = Member::new(
            clean(&req.name)?,
            email,
            password_hash,
            role.id,
            Some(family_id),
        );
        member.phone = req.phone.filter(|p| !p.trim().is_empty());
        member.address = req.address.filter(|a| !a.trim().is_empty());
        member.social_links = req.social_links.unwrap_or_default();

        self.credentials.insert(&mut member).await?;

        tracing::info!(member_id = %member.id, actor_id = %ctx.member_id(), "Member created");
        self.audit
            .record(
                AuditAction::MemberCreated,
                ctx.member_id(),
                member.family_id.as_deref(),
                Some(&member.id),
            )
            .await;

        Ok(member.sanitized())
    }

    pub async fn update(
        &self,
        ctx: &AuthContext,
        id: &str,
        req: UpdateMemberRequest,
    ) -> Result<MemberResponse, ServiceError> {
        let mut member = self.get(ctx, id).await?;

        if let Some(role_id) = req.role_id {
            if role_id != member.role_id {
                if member.id == ctx.member.id {
                    return Err(ServiceError::CannotChangeOwnRole);
                }
                let role = self
                    .role_in_family(&role_id, member.family_id.as_deref())
                    .await?;
                member.role_id = role.id;
            }
        }

        if let Some(name) = req.name {
            member.name = clean(&name)?;
        }

        if let Some(email) = req.email {
            let email = normalize_email(&email);
            if email != member.email {
                self.credentials.ensure_email_available(&email).await?;
                member.email = email;
            }
        }

        if let Some(password) = req.password {
            self.credentials
                .set_password(&mut member, Password::new(password))
                .await?;
        }

        if let Some(phone) = req.phone {
            member.phone = Some(phone).filter(|p| !p.trim().is_empty());
        }
        if let Some(address) = req.address {
            member.address = Some(address).filter(|a| !a.trim().is_empty());
        }
        if let Some(links) = req.social_links {
            member.social_links = links;
        }

        self.credentials.save(&mut member).await?;

        tracing::info!(member_id = %member.id, actor_id = %ctx.member_id(), "Member updated");
        self.audit
            .record(
                AuditAction::MemberUpdated,
                ctx.member_id(),
                member.family_id.as_deref(),
                Some(&member.id),
            )
            .await;

        Ok(member.sanitized())
    }

    pub async fn delete(&self, ctx: &AuthContext, id: &str) -> Result<(), ServiceError> {
        if id == ctx.member.id {
            return Err(ServiceError::CannotDeleteSelf);
        }

        let member = self.get(ctx, id).await?;
        self.members
            .delete_many(doc! { "_id": member.id.as_str() })
            .await?;

        tracing::info!(member_id = %member.id, actor_id = %ctx.member_id(), "Member deleted");
        self.audit
            .record(
                AuditAction::MemberDeleted,
                ctx.member_id(),
                member.family_id.as_deref(),
                Some(&member.id),
            )
            .await;
        Ok(())
    }

    /// The role must live in exactly the given family (`None` = global).
    async fn role_in_family(
        &self,
        role_id: &str,
        family_id: Option<&str>,
    ) -> Result<Role, ServiceError> {
        let invalid = || ServiceError::Validation("Role does not belong to this family".to_string());
        let role = match self.roles.get(role_id, family_id).await {
            Ok(role) => role,
            Err(ServiceError::NotFound(_)) => return Err(invalid()),
            Err(e) => return Err(e),
        };
        if role.family_id.as_deref() != family_id {
            return Err(invalid());
        }
        Ok(role)
    }
}

fn clean(name: &str) -> Result<String, ServiceError> {
    clean_name(name).ok_or_else(|| ServiceError::Validation("Name must not be blank".to_string()))
}
