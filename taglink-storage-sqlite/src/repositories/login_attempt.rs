//! SQLite implementation of the login attempt repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use taglink_core::{
    Error, UserId,
    error::StorageError,
    repositories::LoginAttemptRepository,
    storage::{LoginAttempt, NewLoginAttempt},
};

pub struct SqliteLoginAttemptRepository {
    pool: SqlitePool,
}

impl SqliteLoginAttemptRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Internal struct for query results
#[derive(Debug, sqlx::FromRow)]
struct SqliteLoginAttempt {
    id: i64,
    email: String,
    source_address: String,
    user_id: Option<String>,
    user_agent: Option<String>,
    success: bool,
    blocked: bool,
    twofa_failed: bool,
    created_at: i64,
}

impl From<SqliteLoginAttempt> for LoginAttempt {
    fn from(row: SqliteLoginAttempt) -> Self {
        LoginAttempt {
            id: row.id,
            email: row.email,
            source_address: row.source_address,
            user_id: row.user_id.map(|id| UserId::new(&id)),
            user_agent: row.user_agent,
            success: row.success,
            blocked: row.blocked,
            twofa_failed: row.twofa_failed,
            created_at: DateTime::from_timestamp(row.created_at, 0).expect("Invalid timestamp"),
        }
    }
}

#[async_trait]
impl LoginAttemptRepository for SqliteLoginAttemptRepository {
    async fn record(&self, attempt: NewLoginAttempt) -> Result<LoginAttempt, Error> {
        let now = Utc::now().timestamp();

        let row = sqlx::query_as::<_, SqliteLoginAttempt>(
            r#"
            INSERT INTO login_attempts
                (email, source_address, user_id, user_agent, success, blocked, twofa_failed, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING id, email, source_address, user_id, user_agent, success, blocked, twofa_failed, created_at
            "#,
        )
        .bind(&attempt.email)
        .bind(&attempt.source_address)
        .bind(attempt.user_id.as_ref().map(|id| id.as_str()))
        .bind(&attempt.user_agent)
        .bind(attempt.success)
        .bind(attempt.blocked)
        .bind(attempt.twofa_failed)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to record login attempt");
            StorageError::Database("Failed to record login attempt".to_string())
        })?;

        Ok(row.into())
    }

    async fn count_recent_failures(
        &self,
        source_address: &str,
        since: DateTime<Utc>,
    ) -> Result<u32, Error> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM login_attempts
            WHERE source_address = ?1 AND success = 0 AND created_at >= ?2
            "#,
        )
        .bind(source_address)
        .bind(since.timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to count login failures");
            StorageError::Database("Failed to count login failures".to_string())
        })?;

        Ok(row.0 as u32)
    }
}
