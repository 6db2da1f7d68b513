use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub database: DatabaseConfig,
    pub auth_method: AuthMethod,
    /// Required when `auth_method` is `Ldap`.
    pub directory: Option<DirectoryConfig>,
    pub remember_me_days: i64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

/// Which strategy resolves identities: local password digests or an LDAP
/// directory bind.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Local,
    Ldap,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryConfig {
    pub host: String,
    pub port: u16,
    /// Search base DN.
    pub base: String,
    /// Appended to the raw username as `user@DOMAIN` for the bind principal.
    pub domain: Option<String>,
    /// When set, an entry must carry this group in its membership list.
    pub memberof: Option<String>,
    /// Attribute holding a stable external identifier; optional because not
    /// every directory schema exposes one.
    pub ldap_id_attribute: Option<String>,
    pub conn_timeout_secs: u64,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let auth_method: AuthMethod = get_env("AUTH_METHOD", Some("local"), is_prod)?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let directory = match auth_method {
            AuthMethod::Ldap => Some(DirectoryConfig {
                host: get_env("LDAP_HOST", None, is_prod)?,
                port: get_env("LDAP_PORT", Some("389"), is_prod)?
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        AppError::ConfigError(anyhow::anyhow!(e.to_string()))
                    })?,
                base: get_env("LDAP_BASE", None, is_prod)?,
                domain: optional_env("LDAP_DOMAIN"),
                memberof: optional_env("LDAP_MEMBEROF"),
                ldap_id_attribute: optional_env("LDAP_ID_ATTRIBUTE"),
                conn_timeout_secs: get_env("LDAP_CONN_TIMEOUT_SECS", Some("10"), is_prod)?
                    .parse()
                    .unwrap_or(10),
            }),
            AuthMethod::Local => None,
        };

        let config = AuthConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("auth-service"), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            database: DatabaseConfig {
                url: get_env("DATABASE_URL", None, is_prod)?,
                max_connections: get_env("DATABASE_MAX_CONNECTIONS", Some("10"), is_prod)?
                    .parse()
                    .unwrap_or(10),
                min_connections: get_env("DATABASE_MIN_CONNECTIONS", Some("1"), is_prod)?
                    .parse()
                    .unwrap_or(1),
            },
            auth_method,
            directory,
            remember_me_days: get_env("REMEMBER_ME_DAYS", Some("14"), is_prod)?
                .parse()
                .unwrap_or(14),
        };

        Ok(config)
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod && default.is_none() {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl std::str::FromStr for AuthMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(AuthMethod::Local),
            "ldap" => Ok(AuthMethod::Ldap),
            _ => Err(format!("Invalid auth method: {}", s)),
        }
    }
}
