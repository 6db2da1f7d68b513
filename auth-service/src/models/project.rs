//! Project and stage models - deployment targets owned by the rest of the
//! console; this service only reads them for authorization decisions.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub created_utc: DateTime<Utc>,
}

/// A deployment target environment grouped under a project.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Stage {
    pub id: Uuid,
    pub project_id: Uuid,
    pub name: String,
    pub created_utc: DateTime<Utc>,
}
