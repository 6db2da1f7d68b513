//! Identity resolution and account lifecycle.
//!
//! The resolver dispatches on the strategy picked once at startup; every
//! authentication failure collapses to `None` so callers cannot tell which
//! factor failed.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::credentials;
use super::directory::DirectoryAuthenticator;
use super::error::ServiceError;
use super::store::UserStore;
use crate::models::{NewUser, User};

/// Authentication strategy, selected from configuration at startup and
/// injected into the service.
pub enum AuthStrategy {
    Local,
    Directory(Arc<DirectoryAuthenticator>),
}

impl AuthStrategy {
    pub fn directory(&self) -> Option<&Arc<DirectoryAuthenticator>> {
        match self {
            AuthStrategy::Directory(authenticator) => Some(authenticator),
            AuthStrategy::Local => None,
        }
    }
}

/// Fields for creating an account.
#[derive(Debug, Clone)]
pub struct CreateAccount {
    pub login: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    pub admin: bool,
    pub ldap_id: Option<String>,
}

pub struct AuthService {
    store: Arc<dyn UserStore>,
    strategy: AuthStrategy,
    remember_me_days: i64,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, strategy: AuthStrategy, remember_me_days: i64) -> Self {
        Self {
            store,
            strategy,
            remember_me_days,
        }
    }

    /// Resolve a login/password pair to an enabled account, or nothing.
    pub async fn authenticate(
        &self,
        login: &str,
        password: &str,
    ) -> Result<Option<User>, ServiceError> {
        match &self.strategy {
            AuthStrategy::Local => self.authenticate_locally(login, password).await,
            AuthStrategy::Directory(authenticator) => {
                self.authenticate_directory(authenticator, login, password)
                    .await
            }
        }
    }

    async fn authenticate_locally(
        &self,
        login: &str,
        password: &str,
    ) -> Result<Option<User>, ServiceError> {
        let Some(user) = self.store.find_enabled_by_login(login).await? else {
            return Ok(None);
        };
        Ok(credentials::verify(&user, password).then_some(user))
    }

    /// Directory login reconciles the returned identity with the local
    /// account record: match by login plus directory id first, create
    /// otherwise. The supplied password is recorded on creation so local
    /// fields stay consistent.
    async fn authenticate_directory(
        &self,
        authenticator: &DirectoryAuthenticator,
        login: &str,
        password: &str,
    ) -> Result<Option<User>, ServiceError> {
        let Some(identity) = authenticator.authenticate(login, password).await else {
            return Ok(None);
        };

        if let Some(existing) = self
            .store
            .find_enabled_by_login_and_ldap_id(&identity.login, identity.ldap_id.as_deref())
            .await?
        {
            return Ok(Some(existing));
        }

        let user = self
            .create_account(CreateAccount {
                login: identity.login,
                email: identity.email,
                password: password.to_string(),
                password_confirmation: password.to_string(),
                admin: false,
                ldap_id: identity.ldap_id,
            })
            .await?;
        Ok(Some(user))
    }

    /// Create a validated account. Salt and digest are computed here and
    /// never again for the lifetime of the account unless the password is
    /// reset.
    pub async fn create_account(&self, req: CreateAccount) -> Result<User, ServiceError> {
        self.validate_new_account(&req)?;

        // Pre-checks give friendly errors; the database constraints remain
        // the authority if a concurrent write slips between check and insert.
        if self.store.find_enabled_by_login(&req.login).await?.is_some() {
            return Err(ServiceError::validation(
                "login",
                "name can only be active for one user at a time",
            ));
        }
        if self.store.find_by_email(&req.email).await?.is_some() {
            return Err(ServiceError::validation("email", "has already been taken"));
        }

        let (crypted_password, salt) = if req.password.is_empty() {
            (None, None)
        } else {
            let salt = credentials::generate_salt(&req.login, Utc::now());
            (Some(credentials::encrypt(&req.password, &salt)), Some(salt))
        };

        self.store
            .insert_user(NewUser {
                login: req.login,
                email: req.email,
                crypted_password,
                salt,
                admin: req.admin,
                ldap_id: req.ldap_id,
            })
            .await
    }

    fn validate_new_account(&self, req: &CreateAccount) -> Result<(), ServiceError> {
        let login_length = req.login.chars().count();
        if !(3..=40).contains(&login_length) {
            return Err(ServiceError::validation(
                "login",
                "must be between 3 and 40 characters",
            ));
        }
        let email_length = req.email.chars().count();
        if !(3..=100).contains(&email_length) || !req.email.contains('@') {
            return Err(ServiceError::validation("email", "is invalid"));
        }
        if matches!(self.strategy, AuthStrategy::Directory(_)) && req.ldap_id.is_none() {
            return Err(ServiceError::validation("ldap_id", "can't be blank"));
        }
        if self.password_required() {
            credentials::validate_password_change(&req.password, &req.password_confirmation)?;
        }
        Ok(())
    }

    /// Password fields are mandatory only under the local strategy; the
    /// directory strategy records whatever was supplied without validating.
    fn password_required(&self) -> bool {
        matches!(self.strategy, AuthStrategy::Local)
    }

    /// Reset a password, keeping the account's existing salt.
    pub async fn change_password(
        &self,
        id: Uuid,
        password: &str,
        confirmation: &str,
    ) -> Result<(), ServiceError> {
        credentials::validate_password_change(password, confirmation)?;
        let user = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::UserNotFound)?;
        let salt = user
            .salt
            .clone()
            .unwrap_or_else(|| credentials::generate_salt(&user.login, Utc::now()));
        self.store
            .set_password(id, &credentials::encrypt(password, &salt), &salt)
            .await
    }

    /// Issue a remember-me token for the configured default duration.
    pub async fn remember(&self, user: &User) -> Result<String, ServiceError> {
        self.remember_for(user, Duration::days(self.remember_me_days))
            .await
    }

    pub async fn remember_for(
        &self,
        user: &User,
        duration: Duration,
    ) -> Result<String, ServiceError> {
        self.remember_until(user, Utc::now() + duration).await
    }

    pub async fn remember_until(
        &self,
        user: &User,
        expires_utc: DateTime<Utc>,
    ) -> Result<String, ServiceError> {
        let token = credentials::remember_token(&user.email, expires_utc);
        self.store
            .set_remember_token(user.id, Some(&token), Some(expires_utc))
            .await?;
        Ok(token)
    }

    pub async fn forget(&self, user_id: Uuid) -> Result<(), ServiceError> {
        self.store.set_remember_token(user_id, None, None).await
    }

    /// Soft-delete: the account stops authenticating immediately and its
    /// remember token is revoked.
    pub async fn disable(&self, user_id: Uuid) -> Result<(), ServiceError> {
        if self.store.find_by_id(user_id).await?.is_none() {
            return Err(ServiceError::UserNotFound);
        }
        self.store.set_disabled(user_id, Utc::now()).await
    }

    /// Re-enable, refused when another enabled account took over the login
    /// while this one was disabled.
    pub async fn enable(&self, user_id: Uuid) -> Result<(), ServiceError> {
        if self.store.find_by_id(user_id).await?.is_none() {
            return Err(ServiceError::UserNotFound);
        }
        if self.store.enable(user_id).await? {
            Ok(())
        } else {
            Err(ServiceError::validation(
                "login",
                "name can only be active for one user at a time",
            ))
        }
    }
}
