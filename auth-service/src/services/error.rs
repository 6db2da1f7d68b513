use service_core::error::AppError;
use thiserror::Error;
use validator::{ValidationError, ValidationErrors};

use super::directory::DirectoryError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{field} {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("User not found")]
    UserNotFound,

    #[error("Grant not found")]
    GrantNotFound,

    #[error("This user already has this stage")]
    DuplicateGrant,

    #[error("admin status can not be revoked as there needs to be one admin left")]
    LastAdmin,

    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        ServiceError::Validation {
            field,
            message: message.into(),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::anyhow!(e)),
            ServiceError::Validation { field, message } => {
                let mut errors = ValidationErrors::new();
                let mut detail = ValidationError::new("invalid");
                detail.message = Some(message.into());
                errors.add(field, detail);
                AppError::ValidationError(errors)
            }
            ServiceError::UserNotFound => AppError::NotFound(anyhow::anyhow!("User not found")),
            ServiceError::GrantNotFound => AppError::NotFound(anyhow::anyhow!("Grant not found")),
            ServiceError::DuplicateGrant => {
                AppError::Conflict(anyhow::anyhow!("This user already has this stage"))
            }
            ServiceError::LastAdmin => AppError::Conflict(anyhow::anyhow!(
                "admin status can not be revoked as there needs to be one admin left"
            )),
            ServiceError::Directory(e) => AppError::BadGateway(e.to_string()),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
