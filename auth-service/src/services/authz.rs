//! Authorization engine - who may see which project or stage.
//!
//! Admins see everything; everyone else sees exactly what their stage grants
//! reach. Lookups against unknown ids fail closed.

use std::sync::Arc;

use uuid::Uuid;

use super::error::ServiceError;
use super::store::UserStore;
use crate::models::{Project, Stage, StageGrant, User};

pub struct AuthzService {
    store: Arc<dyn UserStore>,
}

impl AuthzService {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Admin, or at least one grant on a stage of the project.
    pub async fn can_view_project(
        &self,
        user: &User,
        project_id: Uuid,
    ) -> Result<bool, ServiceError> {
        if user.is_admin() {
            return Ok(true);
        }
        self.store.has_grant_in_project(user.id, project_id).await
    }

    /// Admin, or a grant on the stage itself.
    pub async fn can_view_stage(&self, user: &User, stage_id: Uuid) -> Result<bool, ServiceError> {
        if user.is_admin() {
            return Ok(true);
        }
        self.store.grant_exists(user.id, stage_id).await
    }

    /// Every project for admins (ordered by name); the distinct projects
    /// reachable through grants for everyone else.
    pub async fn projects_for(&self, user: &User) -> Result<Vec<Project>, ServiceError> {
        if user.is_admin() {
            self.store.all_projects().await
        } else {
            self.store.granted_projects(user.id).await
        }
    }

    /// Every stage of the project for admins; granted stages only otherwise.
    pub async fn stages_for(
        &self,
        user: &User,
        project_id: Uuid,
    ) -> Result<Vec<Stage>, ServiceError> {
        if user.is_admin() {
            self.store.stages_of_project(project_id).await
        } else {
            self.store.granted_stages_of_project(user.id, project_id).await
        }
    }

    pub async fn make_admin(&self, user_id: Uuid) -> Result<(), ServiceError> {
        if self.store.find_by_id(user_id).await?.is_none() {
            return Err(ServiceError::UserNotFound);
        }
        self.store.set_admin(user_id).await
    }

    /// Refused when `user_id` is the last remaining enabled admin; the store
    /// guards the count inside the update itself.
    pub async fn revoke_admin(&self, user_id: Uuid) -> Result<(), ServiceError> {
        if self.store.find_by_id(user_id).await?.is_none() {
            return Err(ServiceError::UserNotFound);
        }
        if self.store.revoke_admin(user_id).await? {
            Ok(())
        } else {
            Err(ServiceError::LastAdmin)
        }
    }

    /// One grant per (user, stage) pair.
    pub async fn grant_stage(
        &self,
        user_id: Uuid,
        stage_id: Uuid,
    ) -> Result<StageGrant, ServiceError> {
        if self.store.grant_exists(user_id, stage_id).await? {
            return Err(ServiceError::DuplicateGrant);
        }
        self.store.insert_grant(user_id, stage_id).await
    }

    pub async fn revoke_grant(&self, user_id: Uuid, stage_id: Uuid) -> Result<(), ServiceError> {
        if self.store.delete_grant(user_id, stage_id).await? {
            Ok(())
        } else {
            Err(ServiceError::GrantNotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewUser;
    use crate::test_utils::MemoryStore;

    async fn add_user(store: &MemoryStore, login: &str, admin: bool) -> User {
        store
            .insert_user(NewUser {
                login: login.to_string(),
                email: format!("{}@example.com", login),
                crypted_password: None,
                salt: None,
                admin,
                ldap_id: None,
            })
            .await
            .expect("insert user")
    }

    #[tokio::test]
    async fn admins_see_every_project_and_stage() {
        let store = Arc::new(MemoryStore::new());
        let service = AuthzService::new(store.clone());
        let admin = add_user(&store, "admin", true).await;

        let alpha = store.add_project("alpha");
        let beta = store.add_project("beta");
        let staging = store.add_stage(alpha.id, "staging");
        store.add_stage(alpha.id, "production");

        assert!(service.can_view_project(&admin, alpha.id).await.unwrap());
        assert!(service.can_view_stage(&admin, staging.id).await.unwrap());

        let projects = service.projects_for(&admin).await.unwrap();
        assert_eq!(
            projects.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![alpha.id, beta.id]
        );
        assert_eq!(service.stages_for(&admin, alpha.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn non_admins_see_only_granted_stages() {
        let store = Arc::new(MemoryStore::new());
        let service = AuthzService::new(store.clone());
        let user = add_user(&store, "deployer", false).await;

        let alpha = store.add_project("alpha");
        let beta = store.add_project("beta");
        let staging = store.add_stage(alpha.id, "staging");
        let production = store.add_stage(alpha.id, "production");
        let beta_stage = store.add_stage(beta.id, "staging");

        service.grant_stage(user.id, staging.id).await.unwrap();

        assert!(service.can_view_stage(&user, staging.id).await.unwrap());
        assert!(!service.can_view_stage(&user, production.id).await.unwrap());
        assert!(!service.can_view_stage(&user, beta_stage.id).await.unwrap());

        assert!(service.can_view_project(&user, alpha.id).await.unwrap());
        assert!(!service.can_view_project(&user, beta.id).await.unwrap());

        let projects = service.projects_for(&user).await.unwrap();
        assert_eq!(projects.iter().map(|p| p.id).collect::<Vec<_>>(), vec![alpha.id]);

        let stages = service.stages_for(&user, alpha.id).await.unwrap();
        assert_eq!(stages.iter().map(|s| s.id).collect::<Vec<_>>(), vec![staging.id]);
    }

    #[tokio::test]
    async fn unknown_ids_fail_closed() {
        let store = Arc::new(MemoryStore::new());
        let service = AuthzService::new(store.clone());
        let user = add_user(&store, "deployer", false).await;

        assert!(!service.can_view_project(&user, Uuid::new_v4()).await.unwrap());
        assert!(!service.can_view_stage(&user, Uuid::new_v4()).await.unwrap());
        assert!(service.stages_for(&user, Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_grants_are_rejected() {
        let store = Arc::new(MemoryStore::new());
        let service = AuthzService::new(store.clone());
        let user = add_user(&store, "deployer", false).await;
        let project = store.add_project("alpha");
        let stage = store.add_stage(project.id, "staging");

        service.grant_stage(user.id, stage.id).await.unwrap();
        let duplicate = service.grant_stage(user.id, stage.id).await;
        assert!(matches!(duplicate, Err(ServiceError::DuplicateGrant)));
    }

    #[tokio::test]
    async fn revoking_a_grant_removes_access() {
        let store = Arc::new(MemoryStore::new());
        let service = AuthzService::new(store.clone());
        let user = add_user(&store, "deployer", false).await;
        let project = store.add_project("alpha");
        let stage = store.add_stage(project.id, "staging");

        service.grant_stage(user.id, stage.id).await.unwrap();
        service.revoke_grant(user.id, stage.id).await.unwrap();
        assert!(!service.can_view_stage(&user, stage.id).await.unwrap());

        let missing = service.revoke_grant(user.id, stage.id).await;
        assert!(matches!(missing, Err(ServiceError::GrantNotFound)));
    }

    #[tokio::test]
    async fn last_enabled_admin_keeps_admin_status() {
        let store = Arc::new(MemoryStore::new());
        let service = AuthzService::new(store.clone());
        let only_admin = add_user(&store, "admin", true).await;

        let refused = service.revoke_admin(only_admin.id).await;
        assert!(matches!(refused, Err(ServiceError::LastAdmin)));
        let still_admin = store.find_by_id(only_admin.id).await.unwrap().unwrap();
        assert!(still_admin.is_admin());
    }

    #[tokio::test]
    async fn revoking_one_of_two_admins_succeeds() {
        let store = Arc::new(MemoryStore::new());
        let service = AuthzService::new(store.clone());
        let first = add_user(&store, "admin1", true).await;
        add_user(&store, "admin2", true).await;

        service.revoke_admin(first.id).await.unwrap();
        let demoted = store.find_by_id(first.id).await.unwrap().unwrap();
        assert!(!demoted.is_admin());
        assert_eq!(store.enabled_admin_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn disabled_admins_do_not_count_toward_the_minimum() {
        let store = Arc::new(MemoryStore::new());
        let service = AuthzService::new(store.clone());
        let active = add_user(&store, "admin1", true).await;
        let dormant = add_user(&store, "admin2", true).await;
        store.set_disabled(dormant.id, chrono::Utc::now()).await.unwrap();

        // Only one enabled admin remains, so it cannot be demoted...
        assert!(matches!(
            service.revoke_admin(active.id).await,
            Err(ServiceError::LastAdmin)
        ));
        // ...but the disabled one can.
        service.revoke_admin(dormant.id).await.unwrap();
    }

    #[tokio::test]
    async fn make_admin_grants_full_visibility() {
        let store = Arc::new(MemoryStore::new());
        let service = AuthzService::new(store.clone());
        let user = add_user(&store, "deployer", false).await;
        let project = store.add_project("alpha");
        store.add_stage(project.id, "staging");

        assert!(!service.can_view_project(&user, project.id).await.unwrap());
        service.make_admin(user.id).await.unwrap();
        let promoted = store.find_by_id(user.id).await.unwrap().unwrap();
        assert!(service.can_view_project(&promoted, project.id).await.unwrap());
    }
}
