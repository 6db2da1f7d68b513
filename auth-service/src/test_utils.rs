//! In-memory test doubles for the storage and directory boundaries.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::config::DirectoryConfig;
use crate::models::{NewUser, Project, Stage, StageGrant, User};
use crate::services::directory::{DirectoryClient, DirectoryEntry, DirectoryError};
use crate::services::error::ServiceError;
use crate::services::store::UserStore;

/// Directory config pointing at a fictional server, for stubbed clients.
pub fn directory_config() -> DirectoryConfig {
    DirectoryConfig {
        host: "directory.example.com".to_string(),
        port: 389,
        base: "DC=example,DC=com".to_string(),
        domain: Some("EXAMPLE".to_string()),
        memberof: None,
        ldap_id_attribute: Some("objectguid".to_string()),
        conn_timeout_secs: 10,
    }
}

/// Scripted [`DirectoryClient`] that records the principals it was asked to
/// bind as.
pub struct StubDirectory {
    outcome: StubOutcome,
    seen: Mutex<Vec<String>>,
}

enum StubOutcome {
    BindRejected,
    Entry(DirectoryEntry),
    Transport(String),
}

impl StubDirectory {
    pub fn rejecting_bind() -> Self {
        Self {
            outcome: StubOutcome::BindRejected,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(entry: DirectoryEntry) -> Self {
        Self {
            outcome: StubOutcome::Entry(entry),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            outcome: StubOutcome::Transport(message.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen_principals(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl DirectoryClient for StubDirectory {
    async fn fetch_entry(
        &self,
        principal: &str,
        _password: &str,
        _login: &str,
        _attrs: &[String],
    ) -> Result<Option<DirectoryEntry>, DirectoryError> {
        self.seen.lock().unwrap().push(principal.to_string());
        match &self.outcome {
            StubOutcome::BindRejected => Ok(None),
            StubOutcome::Entry(entry) => Ok(Some(entry.clone())),
            StubOutcome::Transport(message) => Err(DirectoryError::Unavailable(message.clone())),
        }
    }
}

/// In-memory [`UserStore`] mirroring the database constraints, so service
/// tests run without PostgreSQL.
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: Vec<User>,
    grants: Vec<StageGrant>,
    projects: Vec<Project>,
    stages: Vec<Stage>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn add_project(&self, name: &str) -> Project {
        let project = Project {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_utc: Utc::now(),
        };
        self.inner.lock().unwrap().projects.push(project.clone());
        project
    }

    pub fn add_stage(&self, project_id: Uuid, name: &str) -> Stage {
        let stage = Stage {
            id: Uuid::new_v4(),
            project_id,
            name: name.to_string(),
            created_utc: Utc::now(),
        };
        self.inner.lock().unwrap().stages.push(stage.clone());
        stage
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_enabled_by_login(&self, login: &str) -> Result<Option<User>, ServiceError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .iter()
            .find(|u| u.login == login && u.disabled_utc.is_none())
            .cloned())
    }

    async fn find_enabled_by_login_and_ldap_id(
        &self,
        login: &str,
        ldap_id: Option<&str>,
    ) -> Result<Option<User>, ServiceError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .iter()
            .find(|u| {
                u.login == login && u.disabled_utc.is_none() && u.ldap_id.as_deref() == ldap_id
            })
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ServiceError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, ServiceError> {
        let inner = self.inner.lock().unwrap();
        let mut users = inner.users.clone();
        users.sort_by(|a, b| a.login.cmp(&b.login));
        Ok(users)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .users
            .iter()
            .any(|u| u.login == user.login && u.disabled_utc.is_none())
        {
            return Err(ServiceError::validation(
                "login",
                "name can only be active for one user at a time",
            ));
        }
        if inner
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(ServiceError::validation("email", "has already been taken"));
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            login: user.login,
            email: user.email,
            crypted_password: user.crypted_password,
            salt: user.salt,
            admin: user.admin,
            disabled_utc: None,
            remember_token: None,
            remember_token_expires_utc: None,
            ldap_id: user.ldap_id,
            created_utc: now,
            updated_utc: now,
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn set_password(
        &self,
        id: Uuid,
        crypted_password: &str,
        salt: &str,
    ) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(user) = inner.users.iter_mut().find(|u| u.id == id) {
            user.crypted_password = Some(crypted_password.to_string());
            user.salt = Some(salt.to_string());
            user.updated_utc = Utc::now();
        }
        Ok(())
    }

    async fn set_remember_token(
        &self,
        id: Uuid,
        token: Option<&str>,
        expires_utc: Option<DateTime<Utc>>,
    ) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(user) = inner.users.iter_mut().find(|u| u.id == id) {
            user.remember_token = token.map(str::to_string);
            user.remember_token_expires_utc = expires_utc;
            user.updated_utc = Utc::now();
        }
        Ok(())
    }

    async fn set_disabled(
        &self,
        id: Uuid,
        disabled_utc: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(user) = inner.users.iter_mut().find(|u| u.id == id) {
            user.disabled_utc = Some(disabled_utc);
            user.remember_token = None;
            user.remember_token_expires_utc = None;
            user.updated_utc = Utc::now();
        }
        Ok(())
    }

    async fn enable(&self, id: Uuid) -> Result<bool, ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(login) = inner
            .users
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.login.clone())
        else {
            return Ok(false);
        };
        let taken = inner
            .users
            .iter()
            .any(|u| u.login == login && u.disabled_utc.is_none() && u.id != id);
        if taken {
            return Ok(false);
        }
        if let Some(user) = inner.users.iter_mut().find(|u| u.id == id) {
            user.disabled_utc = None;
            user.updated_utc = Utc::now();
        }
        Ok(true)
    }

    async fn set_admin(&self, id: Uuid) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(user) = inner.users.iter_mut().find(|u| u.id == id) {
            user.admin = true;
            user.updated_utc = Utc::now();
        }
        Ok(())
    }

    async fn revoke_admin(&self, id: Uuid) -> Result<bool, ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        let enabled_admins = inner
            .users
            .iter()
            .filter(|u| u.admin && u.disabled_utc.is_none())
            .count();
        let Some(user) = inner.users.iter_mut().find(|u| u.id == id) else {
            return Ok(false);
        };
        if user.admin && user.disabled_utc.is_none() && enabled_admins <= 1 {
            return Ok(false);
        }
        user.admin = false;
        user.updated_utc = Utc::now();
        Ok(true)
    }

    async fn enabled_admin_count(&self) -> Result<i64, ServiceError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .iter()
            .filter(|u| u.admin && u.disabled_utc.is_none())
            .count() as i64)
    }

    async fn insert_grant(
        &self,
        user_id: Uuid,
        stage_id: Uuid,
    ) -> Result<StageGrant, ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .grants
            .iter()
            .any(|g| g.user_id == user_id && g.stage_id == stage_id)
        {
            return Err(ServiceError::DuplicateGrant);
        }
        let grant = StageGrant::new(user_id, stage_id);
        inner.grants.push(grant.clone());
        Ok(grant)
    }

    async fn delete_grant(&self, user_id: Uuid, stage_id: Uuid) -> Result<bool, ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.grants.len();
        inner
            .grants
            .retain(|g| !(g.user_id == user_id && g.stage_id == stage_id));
        Ok(inner.grants.len() < before)
    }

    async fn grant_exists(&self, user_id: Uuid, stage_id: Uuid) -> Result<bool, ServiceError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .grants
            .iter()
            .any(|g| g.user_id == user_id && g.stage_id == stage_id))
    }

    async fn has_grant_in_project(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<bool, ServiceError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.grants.iter().any(|g| {
            g.user_id == user_id
                && inner
                    .stages
                    .iter()
                    .any(|s| s.id == g.stage_id && s.project_id == project_id)
        }))
    }

    async fn all_projects(&self) -> Result<Vec<Project>, ServiceError> {
        let inner = self.inner.lock().unwrap();
        let mut projects = inner.projects.clone();
        projects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(projects)
    }

    async fn granted_projects(&self, user_id: Uuid) -> Result<Vec<Project>, ServiceError> {
        let inner = self.inner.lock().unwrap();
        let mut projects: Vec<Project> = inner
            .projects
            .iter()
            .filter(|p| {
                inner.stages.iter().any(|s| {
                    s.project_id == p.id
                        && inner
                            .grants
                            .iter()
                            .any(|g| g.user_id == user_id && g.stage_id == s.id)
                })
            })
            .cloned()
            .collect();
        projects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(projects)
    }

    async fn stages_of_project(&self, project_id: Uuid) -> Result<Vec<Stage>, ServiceError> {
        let inner = self.inner.lock().unwrap();
        let mut stages: Vec<Stage> = inner
            .stages
            .iter()
            .filter(|s| s.project_id == project_id)
            .cloned()
            .collect();
        stages.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(stages)
    }

    async fn granted_stages_of_project(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<Vec<Stage>, ServiceError> {
        let inner = self.inner.lock().unwrap();
        let mut stages: Vec<Stage> = inner
            .stages
            .iter()
            .filter(|s| {
                s.project_id == project_id
                    && inner
                        .grants
                        .iter()
                        .any(|g| g.user_id == user_id && g.stage_id == s.id)
            })
            .cloned()
            .collect();
        stages.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(stages)
    }
}
