use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::SanitizedUser;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 3, max = 40))]
    pub login: String,
    #[validate(length(min = 1))]
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: SanitizedUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remember_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remember_token_expires_utc: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub user_id: Uuid,
}

/// Administrative directory diagnostics, outside the login path.
#[derive(Debug, Deserialize, Validate)]
pub struct DirectoryLookupRequest {
    #[validate(length(min = 1))]
    pub bind_login: String,
    #[validate(length(min = 1))]
    pub bind_password: String,
    #[validate(length(min = 1))]
    pub login: String,
}
