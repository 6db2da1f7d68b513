pub mod auth;
pub mod authz;
pub mod directory;
pub mod user;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::AppState;

/// Service liveness, including a database ping.
pub async fn health_check(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.db.health_check().await.map_err(AppError::from)?;
    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "status": "healthy" })),
    ))
}
