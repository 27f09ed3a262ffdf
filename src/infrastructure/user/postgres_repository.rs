//! PostgreSQL user store implementation

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{info, warn};

use crate::domain::user::{ListCriteria, NewUser, User, UserChange, UserChanges, UserId, UserStore};
use crate::domain::DomainError;

/// Retries after the first attempt for deadlocks and serialization failures
const MAX_TRANSIENT_RETRIES: u32 = 3;
const TRANSIENT_RETRY_BACKOFF: Duration = Duration::from_millis(100);

const USER_COLUMNS: &str = "id, email, username, hashed_password, full_name, is_active, \
                            is_superuser, created_at, updated_at";

/// PostgreSQL implementation of UserStore
#[derive(Debug, Clone)]
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the users table and its unique constraints if missing
    pub async fn ensure_schema(&self) -> Result<(), DomainError> {
        sqlx::raw_sql(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                email VARCHAR(255) NOT NULL,
                username VARCHAR(50) NOT NULL,
                hashed_password VARCHAR(255) NOT NULL,
                full_name VARCHAR(100),
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                is_superuser BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE UNIQUE INDEX IF NOT EXISTS ix_users_email ON users(email);
            CREATE UNIQUE INDEX IF NOT EXISTS ix_users_username ON users(username);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create users table: {}", e)))?;

        info!("Users table ready");
        Ok(())
    }

    /// Runs a write, retrying deadlocks and serialization failures
    async fn with_transient_retry<T, F, Fut>(&self, operation: &'static str, mut attempt_fn: F) -> Result<T, DomainError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, sqlx::Error>>,
    {
        let mut retries = 0;

        loop {
            match attempt_fn().await {
                Err(e) if is_transient(&e) && retries < MAX_TRANSIENT_RETRIES => {
                    retries += 1;
                    warn!(operation, retry = retries, error = %e, "Transient database error, retrying");
                    tokio::time::sleep(TRANSIENT_RETRY_BACKOFF * retries).await;
                }
                result => return result.map_err(|e| map_sqlx_error(operation, e)),
            }
        }
    }

    async fn try_insert(&self, new_user: &NewUser) -> Result<User, sqlx::Error> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO users (email, username, hashed_password, full_name, is_active, is_superuser)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&new_user.email)
        .bind(&new_user.username)
        .bind(&new_user.password_hash)
        .bind(&new_user.full_name)
        .bind(new_user.is_active)
        .bind(new_user.is_superuser)
        .fetch_one(&self.pool)
        .await?;

        row_to_user(&row)
    }

    async fn try_update(&self, id: UserId, changes: &UserChanges) -> Result<Option<UserChange>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let Some(before) = select_for_update(&mut tx, id).await? else {
            tx.rollback().await?;
            return Ok(None);
        };

        let mut after = before.clone();
        after.apply(changes);

        sqlx::query(
            r#"
            UPDATE users
            SET email = $2, username = $3, hashed_password = $4, full_name = $5,
                is_active = $6, is_superuser = $7, updated_at = $8
            WHERE id = $1
            "#,
        )
        .bind(id.value())
        .bind(after.email())
        .bind(after.username())
        .bind(after.password_hash())
        .bind(after.full_name())
        .bind(after.is_active())
        .bind(after.is_superuser())
        .bind(after.updated_at())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(UserChange { before, after }))
    }

    async fn try_delete(&self, id: UserId) -> Result<Option<User>, sqlx::Error> {
        let row = sqlx::query(&format!("DELETE FROM users WHERE id = $1 RETURNING {}", USER_COLUMNS))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_user).transpose()
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get user: {}", e)))?;

        row.as_ref()
            .map(row_to_user)
            .transpose()
            .map_err(|e| map_sqlx_error("find_by_id", e))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE email = lower($1)", USER_COLUMNS))
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get user by email: {}", e)))?;

        row.as_ref()
            .map(row_to_user)
            .transpose()
            .map_err(|e| map_sqlx_error("find_by_email", e))
    }

    async fn find_many(&self, criteria: &ListCriteria) -> Result<Vec<User>, DomainError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM users
            WHERE ($1::BOOLEAN IS NULL OR is_active = $1)
              AND ($2::BOOLEAN IS NULL OR is_superuser = $2)
            ORDER BY id
            OFFSET $3
            LIMIT $4
            "#,
            USER_COLUMNS
        ))
        .bind(criteria.is_active)
        .bind(criteria.is_superuser)
        .bind(i64::try_from(criteria.skip).unwrap_or(i64::MAX))
        .bind(i64::try_from(criteria.limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list users: {}", e)))?;

        rows.iter()
            .map(row_to_user)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("find_many", e))
    }

    async fn insert(&self, new_user: NewUser) -> Result<User, DomainError> {
        let new_user = &new_user;
        self.with_transient_retry("insert", move || self.try_insert(new_user))
            .await
    }

    async fn update(&self, id: UserId, changes: &UserChanges) -> Result<Option<UserChange>, DomainError> {
        self.with_transient_retry("update", move || self.try_update(id, changes))
            .await
    }

    async fn delete(&self, id: UserId) -> Result<Option<User>, DomainError> {
        self.with_transient_retry("delete", move || self.try_delete(id))
            .await
    }

    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Database ping failed: {}", e)))?;

        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

async fn select_for_update(
    tx: &mut Transaction<'_, Postgres>,
    id: UserId,
) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1 FOR UPDATE", USER_COLUMNS))
        .bind(id.value())
        .fetch_optional(&mut **tx)
        .await?;

    row.as_ref().map(row_to_user).transpose()
}

fn row_to_user(row: &sqlx::postgres::PgRow) -> Result<User, sqlx::Error> {
    let id: i64 = row.try_get("id")?;
    let id = UserId::new(id).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

    Ok(User {
        id,
        email: row.try_get("email")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("hashed_password")?,
        full_name: row.try_get("full_name")?,
        is_active: row.try_get("is_active")?,
        is_superuser: row.try_get("is_superuser")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Deadlock or serialization failure
fn is_transient(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::Database(db) => is_transient_code(db.code().as_deref()),
        _ => false,
    }
}

fn is_transient_code(code: Option<&str>) -> bool {
    matches!(code, Some("40P01") | Some("40001"))
}

fn map_sqlx_error(operation: &str, error: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db) = &error {
        if db.is_unique_violation() {
            return conflict_for_constraint(db.constraint());
        }
    }

    DomainError::storage(format!("Failed to {} user: {}", operation, error))
}

fn conflict_for_constraint(constraint: Option<&str>) -> DomainError {
    match constraint {
        Some(name) if name.contains("email") => {
            DomainError::conflict("Email is already registered")
        }
        Some(name) if name.contains("username") => {
            DomainError::conflict("Username is already taken")
        }
        _ => DomainError::conflict("User already exists"),
    }
}
