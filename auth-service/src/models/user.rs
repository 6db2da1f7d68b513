//! User model - console accounts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A principal of the deployment console.
///
/// Disabling is a soft-delete: `disabled_utc` is set, the account keeps its
/// rows but no longer authenticates and its login may be taken over by a new
/// enabled account.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub login: String,
    pub email: String,
    pub crypted_password: Option<String>,
    pub salt: Option<String>,
    pub admin: bool,
    pub disabled_utc: Option<DateTime<Utc>>,
    pub remember_token: Option<String>,
    pub remember_token_expires_utc: Option<DateTime<Utc>>,
    pub ldap_id: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl User {
    pub fn is_disabled(&self) -> bool {
        self.disabled_utc.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    /// Remember token present and not yet expired at `now`.
    pub fn remember_token_valid(&self, now: DateTime<Utc>) -> bool {
        self.remember_token.is_some()
            && self
                .remember_token_expires_utc
                .is_some_and(|expiry| now < expiry)
    }
}

/// Fields for inserting a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub login: String,
    pub email: String,
    pub crypted_password: Option<String>,
    pub salt: Option<String>,
    pub admin: bool,
    pub ldap_id: Option<String>,
}

/// User representation for API responses (no password material).
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedUser {
    pub id: Uuid,
    pub login: String,
    pub email: String,
    pub admin: bool,
    pub disabled_utc: Option<DateTime<Utc>>,
    pub ldap_id: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl From<&User> for SanitizedUser {
    fn from(u: &User) -> Self {
        Self {
            id: u.id,
            login: u.login.clone(),
            email: u.email.clone(),
            admin: u.admin,
            disabled_utc: u.disabled_utc,
            ldap_id: u.ldap_id.clone(),
            created_utc: u.created_utc,
        }
    }
}

impl From<User> for SanitizedUser {
    fn from(u: User) -> Self {
        SanitizedUser::from(&u)
    }
}
