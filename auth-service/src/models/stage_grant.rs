//! Stage grant model - the authorization record linking a user to a stage.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Permission for one user to view and deploy one stage.
///
/// The (user, stage) pair is unique; grants are removed when either side is
/// deleted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct StageGrant {
    pub id: Uuid,
    pub user_id: Uuid,
    pub stage_id: Uuid,
    pub created_utc: DateTime<Utc>,
}

impl StageGrant {
    pub fn new(user_id: Uuid, stage_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            stage_id,
            created_utc: Utc::now(),
        }
    }
}
