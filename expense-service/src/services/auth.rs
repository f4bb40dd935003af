use mongodb::bson::doc;
use std::time::Duration;

use super::audit::AuditTrail;
use super::credentials::CredentialStore;
use super::database::Database;
use super::error::{with_store_timeout, ServiceError};
use super::guard::AuthContext;
use super::jwt::JwtService;
use super::roles::RoleRegistry;
use crate::dtos::{
    AuthResponse, ChangePasswordRequest, CreateAdminRequest, LoginRequest, RegisterRequest,
    SetupStatusResponse, UpdateProfileRequest, UserProfile,
};
use crate::models::{
    default_categories, AuditAction, Family, Member, Role, SYSTEM_ADMIN_ROLE_ID,
};
use crate::utils::{clean_name, normalize_email, Password, PasswordHashString};

/// Sessions, profile self-service, family registration and system bootstrap.
#[derive(Clone)]
pub struct AuthService {
    db: Database,
    credentials: CredentialStore,
    roles: RoleRegistry,
    jwt: JwtService,
    audit: AuditTrail,
    store_timeout: Duration,
}

impl AuthService {
    pub fn new(
        db: Database,
        credentials: CredentialStore,
        roles: RoleRegistry,
        jwt: JwtService,
        audit: AuditTrail,
        store_timeout: Duration,
    ) -> Self {
        Self {
            db,
            credentials,
            roles,
            jwt,
            audit,
            store_timeout,
        }
    }

    /// Create a family with its starter roles, default categories and head
    /// member. Either all of it is persisted or none of it is.
    pub async fn register(&self, req: RegisterRequest) -> Result<AuthResponse, ServiceError> {
        let blank = || ServiceError::Validation("Names must not be blank".to_string());
        let family_name = clean_name(&req.family_name).ok_or_else(blank)?;
        let name = clean_name(&req.name).ok_or_else(blank)?;

        let email = normalize_email(&req.email);
        with_store_timeout(
            self.store_timeout,
            self.credentials.ensure_email_available(&email),
        )
        .await?;
        let password_hash = self.credentials.hash_new(Password::new(req.password)).await?;

        let family = Family::new(family_name);
        self.db.families.insert_one(&family).await?;

        let (member, head) = match self
            .populate_family(&family, name, email, password_hash)
            .await
        {
            Ok(created) => created,
            Err(e) => {
                tracing::warn!(
                    family_id = %family.id,
                    error = %e,
                    "Family registration failed, rolling back"
                );
                self.rollback_family(&family.id).await;
                return Err(e);
            }
        };

        tracing::info!(family_id = %family.id, member_id = %member.id, "Family registered");
        self.audit
            .record(
                AuditAction::FamilyRegistered,
                &member.id,
                Some(&family.id),
                Some(&family.id),
            )
            .await;

        self.session(&member, &head)
    }

    async fn populate_family(
        &self,
        family: &Family,
        name: String,
        email: String,
        password_hash: PasswordHashString,
    ) -> Result<(Member, Role), ServiceError> {
        let head = self
            .roles
            .seed_family_roles(&family.id)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::Internal(anyhow::anyhow!("No starter roles defined")))?;

        for category in default_categories(&family.id) {
            self.db.categories.insert_one(&category).await?;
        }

        let mut member = Member::new(
            name,
            email,
            password_hash,
            head.id.clone(),
            Some(family.id.clone()),
        );
        self.credentials.insert(&mut member).await?;

        Ok((member, head))
    }

    /// Compensating delete for a partially created family. Every step runs
    /// even if an earlier one fails.
    async fn rollback_family(&self, family_id: &str) {
        if let Err(e) = self.db.members.delete_many(doc! { "family_id": family_id }).await {
            tracing::error!(family_id = %family_id, error = %e, "Rollback failed for members");
        }
        if let Err(e) = self
            .db
            .categories
            .delete_many(doc! { "family_id": family_id })
            .await
        {
            tracing::error!(family_id = %family_id, error = %e, "Rollback failed for categories");
        }
        if let Err(e) = self.roles.delete_family_roles(family_id).await {
            tracing::error!(family_id = %family_id, error = %e, "Rollback failed for roles");
        }
        if let Err(e) = self.db.families.delete_many(doc! { "_id": family_id }).await {
            tracing::error!(family_id = %family_id, error = %e, "Rollback failed for family");
        }
    }

    /// Failures are reported as `InvalidCredentials` whether the email or the
    /// password was wrong.
    pub async fn login(&self, req: LoginRequest) -> Result<AuthResponse, ServiceError> {
        let found =
            with_store_timeout(self.store_timeout, self.credentials.find_by_email(&req.email))
                .await?;
        let Some(member) = found else {
            metrics::counter!("auth_login_total", "outcome" => "failure").increment(1);
            return Err(ServiceError::InvalidCredentials);
        };

        if !self
            .credentials
            .verify_password(&member, Password::new(req.password))
            .await
        {
            metrics::counter!("auth_login_total", "outcome" => "failure").increment(1);
            tracing::info!(member_id = %member.id, "Login rejected");
            return Err(ServiceError::InvalidCredentials);
        }

        let lookup = self.roles.find_role_for_member(&member);
        let role = with_store_timeout(self.store_timeout, lookup)
            .await?
            .ok_or(ServiceError::RoleMissing)?;

        metrics::counter!("auth_login_total", "outcome" => "success").increment(1);
        tracing::info!(member_id = %member.id, "Login succeeded");
        self.audit
            .record(
                AuditAction::Login,
                &member.id,
                member.family_id.as_deref(),
                None,
            )
            .await;

        self.session(&member, &role)
    }

    pub fn profile(&self, ctx: &AuthContext) -> UserProfile {
        profile(&ctx.member, &ctx.role)
    }

    /// Update the caller's own contact details. Role and family are not
    /// reachable from here.
    pub async fn update_me(
        &self,
        ctx: &AuthContext,
        req: UpdateProfileRequest,
    ) -> Result<UserProfile, ServiceError> {
        let mut member = ctx.member.clone();

        if let Some(name) = req.name {
            member.name = clean_name(&name).ok_or_else(|| {
                ServiceError::Validation("Name must not be blank".to_string())
            })?;
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
        self.audit
            .record(
                AuditAction::MemberUpdated,
                &member.id,
                member.family_id.as_deref(),
                Some(&member.id),
            )
            .await;

        Ok(profile(&member, &ctx.role))
    }

    pub async fn change_password(
        &self,
        ctx: &AuthContext,
        req: ChangePasswordRequest,
    ) -> Result<(), ServiceError> {
        let mut member = ctx.member.clone();

        if !self
            .credentials
            .verify_password(&member, Password::new(req.current_password))
            .await
        {
            return Err(ServiceError::Validation(
                "Current password is incorrect".to_string(),
            ));
        }

        self.credentials
            .set_password(&mut member, Password::new(req.new_password))
            .await?;
        self.credentials.save(&mut member).await?;

        self.audit
            .record(
                AuditAction::PasswordChanged,
                &member.id,
                member.family_id.as_deref(),
                Some(&member.id),
            )
            .await;
        Ok(())
    }

    pub async fn setup_status(&self) -> Result<SetupStatusResponse, ServiceError> {
        let members = self.member_count().await?;
        Ok(SetupStatusResponse {
            initialized: members > 0,
        })
    }

    /// One-shot bootstrap of the global administrator. Only allowed while no
    /// member exists at all.
    pub async fn create_admin(&self, req: CreateAdminRequest) -> Result<AuthResponse, ServiceError> {
        if self.member_count().await? > 0 {
            return Err(ServiceError::AlreadyInitialized);
        }

        let name = clean_name(&req.name)
            .ok_or_else(|| ServiceError::Validation("Name must not be blank".to_string()))?;
        let password_hash = self.credentials.hash_new(Password::new(req.password)).await?;
        let role = self.roles.create_system_administrator().await?;

        let mut member = Member::new(
            name,
            normalize_email(&req.email),
            password_hash,
            SYSTEM_ADMIN_ROLE_ID.to_string(),
            None,
        );
        if let Err(e) = self.credentials.insert(&mut member).await {
            tracing::error!(error = %e, "Bootstrap failed, removing administrator role");
            if let Err(cleanup) = self.roles.delete_system_administrator().await {
                tracing::error!(error = %cleanup, "Failed to remove administrator role");
            }
            return Err(e);
        }

        tracing::info!(member_id = %member.id, "System administrator created");
        self.audit
            .record(AuditAction::SystemBootstrapped, &member.id, None, Some(&member.id))
            .await;

        self.session(&member, &role)
    }

    async fn member_count(&self) -> Result<u64, ServiceError> {
        with_store_timeout(self.store_timeout, async {
            Ok(self.db.members.count(doc! {}).await?)
        })
        .await
    }

    fn session(&self, member: &Member, role: &Role) -> Result<AuthResponse, ServiceError> {
        Ok(AuthResponse {
            token: self.jwt.issue(member)?,
            token_type: "Bearer".to_string(),
            expires_in: self.jwt.expires_in(),
            user: profile(member, role),
        })
    }
}

fn profile(member: &Member, role: &Role) -> UserProfile {
    UserProfile {
        member: member.sanitized(),
        role: role.name.clone(),
        permissions: role.permissions.clone(),
    }
}
