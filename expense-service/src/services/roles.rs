use chrono::Utc;
use mongodb::bson::doc;
use std::sync::Arc;

use super::error::ServiceError;
use super::guard::scoped;
use super::store::{DocumentStore, StoreError};
use crate::models::{starter_roles, Member, PermissionSet, Role, SYSTEM_ADMIN_ROLE_ID};

/// Role persistence with the tenancy and referential checks that belong to it.
#[derive(Clone)]
pub struct RoleRegistry {
    roles: Arc<dyn DocumentStore<Role>>,
    members: Arc<dyn DocumentStore<Member>>,
}

impl RoleRegistry {
    pub fn new(roles: Arc<dyn DocumentStore<Role>>, members: Arc<dyn DocumentStore<Member>>) -> Self {
        Self { roles, members }
    }

    /// Load the member's role and check it lives in the member's family.
    ///
    /// `Ok(None)` means the reference dangles. A role from another family is
    /// an integrity error and is never returned.
    pub async fn find_role_for_member(&self, member: &Member) -> Result<Option<Role>, ServiceError> {
        let Some(role) = self
            .roles
            .find_one(doc! { "_id": member.role_id.as_str() })
            .await?
        else {
            return Ok(None);
        };

        if role.family_id != member.family_id {
            tracing::error!(
                member_id = %member.id,
                role_id = %role.id,
                "Role and member belong to different families"
            );
            return Err(ServiceError::Integrity(format!(
                "role {} is not in the family of member {}",
                role.id, member.id
            )));
        }

        Ok(Some(role))
    }

    /// Roles visible to a caller. `None` (system administrator) sees every role.
    pub async fn list(&self, family_id: Option<&str>) -> Result<Vec<Role>, ServiceError> {
        Ok(self.roles.find(scoped(doc! {}, family_id)).await?)
    }

    pub async fn get(&self, id: &str, family_id: Option<&str>) -> Result<Role, ServiceError> {
        self.roles
            .find_one(scoped(doc! { "_id": id }, family_id))
            .await?
            .ok_or(ServiceError::NotFound("Role"))
    }

    pub async fn create(
        &self,
        family_id: &str,
        name: String,
        permissions: PermissionSet,
    ) -> Result<Role, ServiceError> {
        self.ensure_name_available(family_id, &name, None).await?;

        let role = Role::new(name, permissions, Some(family_id.to_string()));
        self.roles.insert_one(&role).await.map_err(name_conflict)?;

        tracing::info!(role_id = %role.id, family_id = %family_id, "Role created");
        Ok(role)
    }

    pub async fn update(
        &self,
        id: &str,
        family_id: Option<&str>,
        name: Option<String>,
        permissions: Option<PermissionSet>,
    ) -> Result<Role, ServiceError> {
        let mut role = self.get(id, family_id).await?;
        if role.id == SYSTEM_ADMIN_ROLE_ID {
            return Err(ServiceError::Validation(
                "The System Administrator role cannot be modified".to_string(),
            ));
        }

        if let Some(name) = name {
            if name != role.name {
                let role_family = role.family_id.clone().unwrap_or_default();
                self.ensure_name_available(&role_family, &name, Some(&role.id))
                    .await?;
                role.name = name;
            }
        }
        if let Some(permissions) = permissions {
            role.permissions = permissions;
        }
        role.updated_at = Utc::now();

        let matched = self
            .roles
            .replace_one(doc! { "_id": role.id.as_str() }, &role)
            .await
            .map_err(name_conflict)?;
        if !matched {
            return Err(ServiceError::NotFound("Role"));
        }

        tracing::info!(role_id = %role.id, "Role updated");
        Ok(role)
    }

    /// Delete a role nobody references.
    pub async fn delete(&self, id: &str, family_id: Option<&str>) -> Result<(), ServiceError> {
        let role = self.get(id, family_id).await?;
        if role.id == SYSTEM_ADMIN_ROLE_ID {
            return Err(ServiceError::Validation(
                "The System Administrator role cannot be deleted".to_string(),
            ));
        }

        let assigned = self
            .members
            .count(doc! { "role_id": role.id.as_str() })
            .await?;
        if assigned > 0 {
            tracing::warn!(role_id = %role.id, assigned, "Refusing to delete role in use");
            return Err(ServiceError::RoleInUse);
        }

        self.roles.delete_many(doc! { "_id": role.id.as_str() }).await?;
        tracing::info!(role_id = %role.id, "Role deleted");
        Ok(())
    }

    /// Insert the starter roles for a new family. The head role comes first.
    pub async fn seed_family_roles(&self, family_id: &str) -> Result<Vec<Role>, ServiceError> {
        let mut seeded = Vec::new();
        for (name, permissions) in starter_roles() {
            let role = Role::new(name.to_string(), permissions, Some(family_id.to_string()));
            self.roles.insert_one(&role).await?;
            seeded.push(role);
        }
        Ok(seeded)
    }

    /// Insert the global administrator role. Its id is fixed, so a second
    /// insert fails on the primary key even when two bootstraps race.
    pub async fn create_system_administrator(&self) -> Result<Role, ServiceError> {
        let role = Role::system_administrator();
        self.roles.insert_one(&role).await.map_err(|e| match e {
            StoreError::DuplicateKey(_) => ServiceError::AlreadyInitialized,
            other => ServiceError::Store(other),
        })?;
        Ok(role)
    }

    pub async fn delete_family_roles(&self, family_id: &str) -> Result<u64, ServiceError> {
        Ok(self.roles.delete_many(doc! { "family_id": family_id }).await?)
    }

    pub async fn delete_system_administrator(&self) -> Result<u64, ServiceError> {
        Ok(self
            .roles
            .delete_many(doc! { "_id": SYSTEM_ADMIN_ROLE_ID })
            .await?)
    }

    async fn ensure_name_available(
        &self,
        family_id: &str,
        name: &str,
        except_id: Option<&str>,
    ) -> Result<(), ServiceError> {
        let existing = self
            .roles
            .find_one(doc! { "family_id": family_id, "name": name })
            .await?;
        match existing {
            Some(role) if Some(role.id.as_str()) != except_id => Err(ServiceError::Conflict(
                format!("A role named '{}' already exists", name),
            )),
            _ => Ok(()),
        }
    }
}

fn name_conflict(err: StoreError) -> ServiceError {
    match err {
        StoreError::DuplicateKey(_) => {
            ServiceError::Conflict("A role with this name already exists".to_string())
        }
        other => ServiceError::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Permission;
    use crate::services::store::MemoryCollection;
    use crate::utils::{hash_password, Password};

    fn registry() -> (RoleRegistry, Arc<dyn DocumentStore<Member>>) {
        let members: Arc<dyn DocumentStore<Member>> = Arc::new(MemoryCollection::<Member>::new());
        let roles: Arc<dyn DocumentStore<Role>> =
            Arc::new(MemoryCollection::<Role>::new().with_unique(&["family_id", "name"]));
        (RoleRegistry::new(roles, members.clone()), members)
    }

    fn member_with(role: &Role, family: Option<&str>) -> Member {
        Member::new(
            "Alice".to_string(),
            "alice@x.com".to_string(),
            hash_password(&Password::new("Passw0rd!")).unwrap(),
            role.id.clone(),
            family.map(str::to_string),
        )
    }

    #[tokio::test]
    async fn test_find_role_for_member() {
        let (registry, _) = registry();
        let seeded = registry.seed_family_roles("family-a").await.unwrap();
        let head = &seeded[0];

        let alice = member_with(head, Some("family-a"));
        let role = registry.find_role_for_member(&alice).await.unwrap().unwrap();
        assert_eq!(role.id, head.id);
        assert!(role.permissions.contains(&Permission::RolesManage));
    }

    #[tokio::test]
    async fn test_cross_family_role_is_integrity_error() {
        let (registry, _) = registry();
        let family_b_roles = registry.seed_family_roles("family-b").await.unwrap();

        let alice = member_with(&family_b_roles[0], Some("family-a"));
        let result = registry.find_role_for_member(&alice).await;
        assert!(matches!(result, Err(ServiceError::Integrity(_))));

        let admin_role = registry.create_system_administrator().await.unwrap();
        let family_member_with_global_role = member_with(&admin_role, Some("family-a"));
        assert!(matches!(
            registry.find_role_for_member(&family_member_with_global_role).await,
            Err(ServiceError::Integrity(_))
        ));
    }

    #[tokio::test]
    async fn test_dangling_role_is_none() {
        let (registry, _) = registry();
        let seeded = registry.seed_family_roles("family-a").await.unwrap();
        let alice = member_with(&seeded[2], Some("family-a"));

        registry.delete(&seeded[2].id, Some("family-a")).await.unwrap();
        assert!(registry.find_role_for_member(&alice).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_refused_while_in_use() {
        let (registry, members) = registry();
        let seeded = registry.seed_family_roles("family-a").await.unwrap();
        let alice = member_with(&seeded[0], Some("family-a"));
        members.insert_one(&alice).await.unwrap();

        let result = registry.delete(&seeded[0].id, Some("family-a")).await;
        assert!(matches!(result, Err(ServiceError::RoleInUse)));
        assert!(registry.get(&seeded[0].id, Some("family-a")).await.is_ok());
    }

    #[tokio::test]
    async fn test_names_unique_within_family_only() {
        let (registry, _) = registry();
        registry.seed_family_roles("family-a").await.unwrap();
        registry.seed_family_roles("family-b").await.unwrap();

        let duplicate = registry
            .create("family-a", "Manager".to_string(), PermissionSet::new())
            .await;
        assert!(matches!(duplicate, Err(ServiceError::Conflict(_))));

        let auditor = registry
            .create("family-a", "Auditor".to_string(), PermissionSet::new())
            .await
            .unwrap();
        let renamed = registry
            .update(&auditor.id, Some("family-a"), Some("Head".to_string()), None)
            .await;
        assert!(matches!(renamed, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_other_family_role_is_not_found() {
        let (registry, _) = registry();
        let family_b_roles = registry.seed_family_roles("family-b").await.unwrap();

        let result = registry.get(&family_b_roles[0].id, Some("family-a")).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
        assert!(registry.get(&family_b_roles[0].id, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_system_administrator_created_once() {
        let (registry, _) = registry();
        registry.create_system_administrator().await.unwrap();
        assert!(matches!(
            registry.create_system_administrator().await,
            Err(ServiceError::AlreadyInitialized)
        ));
    }
}
