//! PostgreSQL implementation of the storage boundary.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use uuid::Uuid;

use super::error::ServiceError;
use super::store::UserStore;
use crate::models::{NewUser, Project, Stage, StageGrant, User};

/// PostgreSQL database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Ping the database.
    pub async fn health_check(&self) -> Result<(), ServiceError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Map a unique/foreign-key violation onto the field that caused it; other
/// errors pass through as database errors.
fn constraint_error(err: sqlx::Error) -> ServiceError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some("users_enabled_login_idx") => ServiceError::validation(
                    "login",
                    "name can only be active for one user at a time",
                ),
                Some("users_email_idx") => {
                    ServiceError::validation("email", "has already been taken")
                }
                Some("stage_grants_user_stage_key") => ServiceError::DuplicateGrant,
                _ => ServiceError::validation("record", "has already been taken"),
            };
        }
        if db_err.is_foreign_key_violation() {
            return ServiceError::validation("record", "refers to a missing record");
        }
    }
    ServiceError::Database(err)
}

#[async_trait]
impl UserStore for Database {
    async fn find_enabled_by_login(&self, login: &str) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE login = $1 AND disabled_utc IS NULL",
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_enabled_by_login_and_ldap_id(
        &self,
        login: &str,
        ldap_id: Option<&str>,
    ) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            WHERE login = $1 AND disabled_utc IS NULL AND ldap_id IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(login)
        .bind(ldap_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, ServiceError> {
        let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY login ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, ServiceError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, login, email, crypted_password, salt, admin, ldap_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.login)
        .bind(&user.email)
        .bind(&user.crypted_password)
        .bind(&user.salt)
        .bind(user.admin)
        .bind(&user.ldap_id)
        .fetch_one(&self.pool)
        .await
        .map_err(constraint_error)
    }

    async fn set_password(
        &self,
        id: Uuid,
        crypted_password: &str,
        salt: &str,
    ) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            UPDATE users SET crypted_password = $2, salt = $3, updated_utc = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(crypted_password)
        .bind(salt)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_remember_token(
        &self,
        id: Uuid,
        token: Option<&str>,
        expires_utc: Option<DateTime<Utc>>,
    ) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            UPDATE users
            SET remember_token = $2, remember_token_expires_utc = $3, updated_utc = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(token)
        .bind(expires_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_disabled(
        &self,
        id: Uuid,
        disabled_utc: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            UPDATE users
            SET disabled_utc = $2, remember_token = NULL,
                remember_token_expires_utc = NULL, updated_utc = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(disabled_utc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn enable(&self, id: Uuid) -> Result<bool, ServiceError> {
        // Conditional update: refuses when another enabled account already
        // holds the login, without a separate read.
        let result = sqlx::query(
            r#"
            UPDATE users SET disabled_utc = NULL, updated_utc = now()
            WHERE id = $1
              AND NOT EXISTS (
                  SELECT 1 FROM users other
                  WHERE other.login = users.login
                    AND other.disabled_utc IS NULL
                    AND other.id <> users.id
              )
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_admin(&self, id: Uuid) -> Result<(), ServiceError> {
        sqlx::query("UPDATE users SET admin = TRUE, updated_utc = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_admin(&self, id: Uuid) -> Result<bool, ServiceError> {
        // The last-admin guard runs inside the statement, so concurrent
        // revokes cannot both pass a stale pre-check.
        let result = sqlx::query(
            r#"
            UPDATE users SET admin = FALSE, updated_utc = now()
            WHERE id = $1
              AND (
                  NOT admin
                  OR disabled_utc IS NOT NULL
                  OR (SELECT count(*) FROM users u
                      WHERE u.admin AND u.disabled_utc IS NULL) > 1
              )
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn enabled_admin_count(&self) -> Result<i64, ServiceError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM users WHERE admin AND disabled_utc IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn insert_grant(
        &self,
        user_id: Uuid,
        stage_id: Uuid,
    ) -> Result<StageGrant, ServiceError> {
        sqlx::query_as::<_, StageGrant>(
            r#"
            INSERT INTO stage_grants (id, user_id, stage_id)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(stage_id)
        .fetch_one(&self.pool)
        .await
        .map_err(constraint_error)
    }

    async fn delete_grant(&self, user_id: Uuid, stage_id: Uuid) -> Result<bool, ServiceError> {
        let result = sqlx::query("DELETE FROM stage_grants WHERE user_id = $1 AND stage_id = $2")
            .bind(user_id)
            .bind(stage_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn grant_exists(&self, user_id: Uuid, stage_id: Uuid) -> Result<bool, ServiceError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM stage_grants WHERE user_id = $1 AND stage_id = $2)",
        )
        .bind(user_id)
        .bind(stage_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn has_grant_in_project(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<bool, ServiceError> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM stage_grants g
                JOIN stages s ON s.id = g.stage_id
                WHERE g.user_id = $1 AND s.project_id = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(project_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn all_projects(&self) -> Result<Vec<Project>, ServiceError> {
        let projects =
            sqlx::query_as::<_, Project>("SELECT * FROM projects ORDER BY name ASC")
                .fetch_all(&self.pool)
                .await?;
        Ok(projects)
    }

    async fn granted_projects(&self, user_id: Uuid) -> Result<Vec<Project>, ServiceError> {
        let projects = sqlx::query_as::<_, Project>(
            r#"
            SELECT DISTINCT p.* FROM projects p
            JOIN stages s ON s.project_id = p.id
            JOIN stage_grants g ON g.stage_id = s.id
            WHERE g.user_id = $1
            ORDER BY p.name ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(projects)
    }

    async fn stages_of_project(&self, project_id: Uuid) -> Result<Vec<Stage>, ServiceError> {
        let stages = sqlx::query_as::<_, Stage>(
            "SELECT * FROM stages WHERE project_id = $1 ORDER BY name ASC",
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(stages)
    }

    async fn granted_stages_of_project(
        &self,
        user_id: Uuid,
        project_id: Uuid,
    ) -> Result<Vec<Stage>, ServiceError> {
        let stages = sqlx::query_as::<_, Stage>(
            r#"
            SELECT s.* FROM stages s
            JOIN stage_grants g ON g.stage_id = s.id
            WHERE g.user_id = $1 AND s.project_id = $2
            ORDER BY s.name ASC
            "#,
        )
        .bind(user_id)
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(stages)
    }
}
