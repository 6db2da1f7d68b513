//! Storage boundary for accounts, grants and the read-only project/stage
//! query surface.
//!
//! Uniqueness (enabled login, email, grant pair) is ultimately enforced by
//! database constraints; implementations surface constraint violations as
//! validation failures so a race between an application pre-check and the
//! write degrades to a rejected request, not corrupted data.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::error::ServiceError;
use crate::models::{NewUser, Project, Stage, StageGrant, User};

#[async_trait]
pub trait UserStore: Send + Sync {
    // Account lookups. Disabled accounts are never matched by the
    // enabled-scoped lookups.
    async fn find_enabled_by_login(&self, login: &str) -> Result<Option<User>, ServiceError>;
    async fn find_enabled_by_login_and_ldap_id(
        &self,
        login: &str,
        ldap_id: Option<&str>,
    ) -> Result<Option<User>, ServiceError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ServiceError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError>;
    async fn list_users(&self) -> Result<Vec<User>, ServiceError>;

    // Account writes. Each is a single atomic statement.
    async fn insert_user(&self, user: NewUser) -> Result<User, ServiceError>;
    async fn set_password(
        &self,
        id: Uuid,
        crypted_password: &str,
        salt: &str,
    ) -> Result<(), ServiceError>;
    async fn set_remember_token(
        &self,
        id: Uuid,
        token: Option<&str>,
        expires_utc: Option<DateTime<Utc>>,
    ) -> Result<(), ServiceError>;
    /// Soft-delete; clears remember-token state in the same write.
    async fn set_disabled(&self, id: Uuid, disabled_utc: DateTime<Utc>) -> Result<(), ServiceError>;
    /// Re-enable. `false` when another enabled account already holds the
    /// login (the conditional update did not apply).
    async fn enable(&self, id: Uuid) -> Result<bool, ServiceError>;

    // Admin flag.
    async fn set_admin(&self, id: Uuid) -> Result<(), ServiceError>;
    /// Conditionally clear the admin flag. `false` when the update was
    /// refused because `id` is the last remaining enabled admin.
    async fn revoke_admin(&self, id: Uuid) -> Result<bool, ServiceError>;
    async fn enabled_admin_count(&self) -> Result<i64, ServiceError>;

    // Grants.
    async fn insert_grant(&self, user_id: Uuid, stage_id: Uuid)
        -> Result<StageGrant, ServiceError>;
    async fn delete_grant(&self, user_id: Uuid, stage_id: Uuid) -> Result<bool, ServiceError>;
    async fn grant_exists(&self, user_id: Uuid, stage_id: Uuid) -> Result<bool, ServiceError>;
    async fn has_grant_in_project(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<bool, ServiceError>;

    // Project/stage read surface. Unknown ids yield empty results.
    async fn all_projects(&self) -> Result<Vec<Project>, ServiceError>;
    async fn granted_projects(&self, user_id: Uuid) -> Result<Vec<Project>, ServiceError>;
    async fn stages_of_project(&self, project_id: Uuid) -> Result<Vec<Stage>, ServiceError>;
    async fn granted_stages_of_project(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<Vec<Stage>, ServiceError>;
}
