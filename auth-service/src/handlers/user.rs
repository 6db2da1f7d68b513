use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{
    dtos::user::{ChangePasswordRequest, CreateUserRequest, GrantStageRequest},
    models::SanitizedUser,
    services::CreateAccount,
    utils::ValidatedJson,
    AppState,
};

pub async fn create(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .auth
        .create_account(CreateAccount {
            login: req.login,
            email: req.email,
            password: req.password,
            password_confirmation: req.password_confirmation,
            admin: req.admin,
            ldap_id: req.ldap_id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(SanitizedUser::from(user))))
}

pub async fn list(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let users = state.store.list_users().await?;
    let users: Vec<SanitizedUser> = users.into_iter().map(SanitizedUser::from).collect();
    Ok((StatusCode::OK, Json(users)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = load_user(&state, id).await?;
    Ok((StatusCode::OK, Json(SanitizedUser::from(user))))
}

pub async fn disable(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.disable(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn enable(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.enable(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn make_admin(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.authz.make_admin(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn revoke_admin(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state.authz.revoke_admin(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn change_password(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .auth
        .change_password(id, &req.password, &req.password_confirmation)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn grant_stage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<GrantStageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let grant = state.authz.grant_stage(id, req.stage_id).await?;
    Ok((StatusCode::CREATED, Json(grant)))
}

pub async fn revoke_stage(
    State(state): State<AppState>,
    Path((id, stage_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    state.authz.revoke_grant(id, stage_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn load_user(
    state: &AppState,
    id: Uuid,
) -> Result<crate::models::User, AppError> {
    state
        .store
        .find_by_id(id)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))
}
