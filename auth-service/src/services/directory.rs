//! Directory (LDAP/Active Directory) authentication.
//!
//! The authenticator binds to the directory with the principal's own
//! credentials, fetches the matching entry and normalizes its attributes.
//! On the login path every failure collapses to "not authenticated"; the
//! administrative lookup path keeps transport errors distinct so operators
//! can tell bad credentials apart from an unreachable directory.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ldap3::{ldap_escape, LdapConnAsync, LdapConnSettings, Scope, SearchEntry};
use thiserror::Error;

use crate::config::DirectoryConfig;

/// Canonical account-name attribute searched for the raw login.
pub const ACCOUNT_NAME_ATTRIBUTE: &str = "sAMAccountName";
pub const MAIL_ATTRIBUTE: &str = "mail";
pub const MEMBER_OF_ATTRIBUTE: &str = "memberOf";

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("directory protocol error: {0}")]
    Protocol(#[from] ldap3::LdapError),

    #[error("directory unavailable: {0}")]
    Unavailable(String),
}

/// Normalized identity attributes from a qualifying directory entry.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DirectoryIdentity {
    pub login: String,
    pub email: String,
    pub ldap_id: Option<String>,
}

/// One directory entry, keyed by attribute name.
#[derive(Debug, Clone, Default)]
pub struct DirectoryEntry {
    pub attrs: HashMap<String, Vec<String>>,
}

impl DirectoryEntry {
    pub fn first(&self, attr: &str) -> Option<&str> {
        self.attrs
            .get(attr)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn has_value(&self, attr: &str, value: &str) -> bool {
        self.attrs
            .get(attr)
            .is_some_and(|values| values.iter().any(|v| v == value))
    }
}

/// Transport seam between the authenticator and the directory server.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Simple-bind as `principal` and fetch the entry whose account-name
    /// attribute equals `login`, requesting `attrs`. `Ok(None)` when the
    /// bind is rejected or no entry matches; `Err` only for transport or
    /// protocol failures.
    async fn fetch_entry(
        &self,
        principal: &str,
        password: &str,
        login: &str,
        attrs: &[String],
    ) -> Result<Option<DirectoryEntry>, DirectoryError>;
}

/// Production client backed by `ldap3`.
pub struct LdapDirectory {
    config: DirectoryConfig,
}

impl LdapDirectory {
    pub fn new(config: DirectoryConfig) -> Self {
        Self { config }
    }

    fn url(&self) -> String {
        format!("ldap://{}:{}", self.config.host, self.config.port)
    }
}

#[async_trait]
impl DirectoryClient for LdapDirectory {
    async fn fetch_entry(
        &self,
        principal: &str,
        password: &str,
        login: &str,
        attrs: &[String],
    ) -> Result<Option<DirectoryEntry>, DirectoryError> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(Duration::from_secs(self.config.conn_timeout_secs));
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &self.url()).await?;
        ldap3::drive!(conn);

        let bind = ldap.simple_bind(principal, password).await?;
        if bind.rc != 0 {
            let _ = ldap.unbind().await;
            return Ok(None);
        }

        let filter = format!("({}={})", ACCOUNT_NAME_ATTRIBUTE, ldap_escape(login));
        let (entries, _res) = ldap
            .search(&self.config.base, Scope::Subtree, &filter, attrs)
            .await?
            .success()?;
        let _ = ldap.unbind().await;

        Ok(entries.into_iter().next().map(|entry| {
            let entry = SearchEntry::construct(entry);
            DirectoryEntry { attrs: entry.attrs }
        }))
    }
}

/// Authenticates principals against the configured directory.
pub struct DirectoryAuthenticator {
    config: DirectoryConfig,
    client: Arc<dyn DirectoryClient>,
}

impl DirectoryAuthenticator {
    pub fn new(config: DirectoryConfig) -> Self {
        let client = Arc::new(LdapDirectory::new(config.clone()));
        Self { config, client }
    }

    /// Injectable client, for tests.
    pub fn with_client(config: DirectoryConfig, client: Arc<dyn DirectoryClient>) -> Self {
        Self { config, client }
    }

    /// Login-path authentication. Bad credentials, missing entries, missing
    /// group membership and transport failures all collapse to `None`; the
    /// caller must never crash because the directory is down.
    pub async fn authenticate(&self, username: &str, password: &str) -> Option<DirectoryIdentity> {
        let principal = self.principal_for(username);
        let attrs = self.search_attributes();
        match self
            .client
            .fetch_entry(&principal, password, username, &attrs)
            .await
        {
            Ok(Some(entry)) => self.identity_from(username, &entry),
            Ok(None) => None,
            Err(err) => {
                tracing::error!(username, error = %err, "directory authentication failed");
                None
            }
        }
    }

    /// Administrative lookup of a directory account, outside the login path.
    /// Transport errors propagate as [`DirectoryError`].
    pub async fn lookup(
        &self,
        bind_login: &str,
        bind_password: &str,
        username: &str,
    ) -> Result<Option<DirectoryIdentity>, DirectoryError> {
        let principal = self.principal_for(bind_login);
        let attrs = self.search_attributes();
        let entry = self
            .client
            .fetch_entry(&principal, bind_password, username, &attrs)
            .await?;
        Ok(entry.and_then(|entry| self.identity_from(username, &entry)))
    }

    /// Bind principal name: `user@DOMAIN` when a domain suffix is configured,
    /// the raw username otherwise.
    fn principal_for(&self, username: &str) -> String {
        match &self.config.domain {
            Some(domain) => format!("{}@{}", username, domain),
            None => username.to_string(),
        }
    }

    fn search_attributes(&self) -> Vec<String> {
        let mut attrs = vec![MAIL_ATTRIBUTE.to_string()];
        if let Some(attr) = &self.config.ldap_id_attribute {
            attrs.push(attr.clone());
        }
        if self.config.memberof.is_some() {
            attrs.push(MEMBER_OF_ATTRIBUTE.to_string());
        }
        attrs
    }

    /// Membership gate plus attribute extraction. An entry without the
    /// required group, or without a mail value, is treated as not found.
    fn identity_from(&self, login: &str, entry: &DirectoryEntry) -> Option<DirectoryIdentity> {
        if let Some(group) = &self.config.memberof {
            if !entry.has_value(MEMBER_OF_ATTRIBUTE, group) {
                return None;
            }
        }
        let email = entry.first(MAIL_ATTRIBUTE)?.to_string();
        let ldap_id = self
            .config
            .ldap_id_attribute
            .as_deref()
            .and_then(|attr| entry.first(attr))
            .map(str::to_string);
        Some(DirectoryIdentity {
            login: login.to_string(),
            email,
            ldap_id,
        })
    }
}
