use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{handlers::user::load_user, AppState};

/// Projects the user may see: all of them for admins, granted ones otherwise.
pub async fn projects(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = load_user(&state, id).await?;
    let projects = state.authz.projects_for(&user).await?;
    Ok((StatusCode::OK, Json(projects)))
}

pub async fn stages(
    State(state): State<AppState>,
    Path((id, project_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let user = load_user(&state, id).await?;
    let stages = state.authz.stages_for(&user, project_id).await?;
    Ok((StatusCode::OK, Json(stages)))
}

pub async fn check_project(
    State(state): State<AppState>,
    Path((id, project_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let user = load_user(&state, id).await?;
    let authorized = state.authz.can_view_project(&user, project_id).await?;
    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "authorized": authorized })),
    ))
}

pub async fn check_stage(
    State(state): State<AppState>,
    Path((id, stage_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let user = load_user(&state, id).await?;
    let authorized = state.authz.can_view_stage(&user, stage_id).await?;
    Ok((
        StatusCode::OK,
        Json(serde_json::json!({ "authorized": authorized })),
    ))
}
