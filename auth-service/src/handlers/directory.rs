use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::{dtos::auth::DirectoryLookupRequest, services::ServiceError, utils::ValidatedJson, AppState};

/// Look up a directory account with the caller's own bind credentials.
/// Unlike login, a directory outage here surfaces as 502 so operators can
/// tell an unreachable server apart from a missing account.
pub async fn lookup(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<DirectoryLookupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let Some(authenticator) = &state.directory else {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Directory authentication is not configured"
        )));
    };

    let identity = authenticator
        .lookup(&req.bind_login, &req.bind_password, &req.login)
        .await
        .map_err(ServiceError::from)?;

    Ok((
        StatusCode::OK,
        Json(serde_json::json!({
            "found": identity.is_some(),
            "identity": identity,
        })),
    ))
}
