use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{Duration, Utc};
use service_core::error::AppError;

use crate::{
    dtos::auth::{LoginRequest, LoginResponse, LogoutRequest},
    utils::ValidatedJson,
    AppState,
};

/// Login with login name and password.
///
/// Bad credentials, unknown logins, disabled accounts and directory failures
/// all produce the same 401; nothing distinguishes which factor failed.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth.authenticate(&req.login, &req.password).await?;
    let Some(user) = user else {
        return Err(AppError::AuthError(anyhow::anyhow!(
            "Invalid login or password"
        )));
    };

    let (remember_token, remember_token_expires_utc) = if req.remember_me {
        let expires_utc = Utc::now() + Duration::days(state.config.remember_me_days);
        let token = state.auth.remember_until(&user, expires_utc).await?;
        (Some(token), Some(expires_utc))
    } else {
        (None, None)
    };

    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            user: user.into(),
            remember_token,
            remember_token_expires_utc,
        }),
    ))
}

/// Logout: revoke the account's remember-me token.
pub async fn logout(
    State(state): State<AppState>,
    Json(req): Json<LogoutRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.forget(req.user_id).await?;
    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "message": "Logged out successfully" })),
    ))
}
