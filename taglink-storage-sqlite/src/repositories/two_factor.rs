//! SQLite implementation of the second-factor repository.
//!
//! Recovery codes are stored as a JSON array in a text column; consumed codes
//! are removed from the array, never tombstoned.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use taglink_core::{
    Error, UserId,
    error::StorageError,
    repositories::TwoFactorRepository,
    storage::{NewTwoFactorRecord, TwoFactorRecord},
};

pub struct SqliteTwoFactorRepository {
    pool: SqlitePool,
}

impl SqliteTwoFactorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Internal struct for query results
#[derive(Debug, sqlx::FromRow)]
struct SqliteTwoFactorRecord {
    user_id: String,
    secret: String,
    is_enabled: bool,
    recovery_codes: String,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<SqliteTwoFactorRecord> for TwoFactorRecord {
    type Error = Error;

    fn try_from(row: SqliteTwoFactorRecord) -> Result<Self, Error> {
        let recovery_codes: Vec<String> = serde_json::from_str(&row.recovery_codes)
            .map_err(|e| {
                tracing::error!(error = %e, "Corrupt recovery code list");
                StorageError::Database("Corrupt recovery code list".to_string())
            })?;

        Ok(TwoFactorRecord {
            user_id: UserId::new(&row.user_id),
            secret: row.secret,
            is_enabled: row.is_enabled,
            recovery_codes,
            created_at: DateTime::from_timestamp(row.created_at, 0).expect("Invalid timestamp"),
            updated_at: DateTime::from_timestamp(row.updated_at, 0).expect("Invalid timestamp"),
        })
    }
}

#[async_trait]
impl TwoFactorRepository for SqliteTwoFactorRepository {
    async fn create(&self, record: NewTwoFactorRecord) -> Result<TwoFactorRecord, Error> {
        let now = Utc::now().timestamp();
        let codes_json = serde_json::to_string(&record.recovery_codes).map_err(|e| {
            tracing::error!(error = %e, "Failed to encode recovery codes");
            StorageError::Database("Failed to encode recovery codes".to_string())
        })?;

        // Re-enrollment replaces the pending record and resets the enabled flag.
        let row = sqlx::query_as::<_, SqliteTwoFactorRecord>(
            r#"
            INSERT INTO user_2fa (user_id, secret, is_enabled, recovery_codes, created_at, updated_at)
            VALUES (?1, ?2, 0, ?3, ?4, ?4)
            ON CONFLICT(user_id) DO UPDATE SET
                secret = excluded.secret,
                is_enabled = 0,
                recovery_codes = excluded.recovery_codes,
                updated_at = excluded.updated_at
            RETURNING user_id, secret, is_enabled, recovery_codes, created_at, updated_at
            "#,
        )
        .bind(record.user_id.as_str())
        .bind(&record.secret)
        .bind(&codes_json)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to store second-factor record");
            StorageError::Database("Failed to store second-factor record".to_string())
        })?;

        row.try_into()
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<TwoFactorRecord>, Error> {
        let row = sqlx::query_as::<_, SqliteTwoFactorRecord>(
            r#"
            SELECT user_id, secret, is_enabled, recovery_codes, created_at, updated_at
            FROM user_2fa
            WHERE user_id = ?1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to fetch second-factor record");
            StorageError::Database("Failed to fetch second-factor record".to_string())
        })?;

        row.map(TryInto::try_into).transpose()
    }

    async fn set_enabled(&self, user_id: &UserId, enabled: bool) -> Result<(), Error> {
        sqlx::query("UPDATE user_2fa SET is_enabled = ?2, updated_at = ?3 WHERE user_id = ?1")
            .bind(user_id.as_str())
            .bind(enabled)
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to update second-factor flag");
                StorageError::Database("Failed to update second-factor flag".to_string())
            })?;

        Ok(())
    }

    async fn update_recovery_codes(
        &self,
        user_id: &UserId,
        codes: &[String],
    ) -> Result<(), Error> {
        let codes_json = serde_json::to_string(codes).map_err(|e| {
            tracing::error!(error = %e, "Failed to encode recovery codes");
            StorageError::Database("Failed to encode recovery codes".to_string())
        })?;

        sqlx::query("UPDATE user_2fa SET recovery_codes = ?2, updated_at = ?3 WHERE user_id = ?1")
            .bind(user_id.as_str())
            .bind(&codes_json)
            .bind(Utc::now().timestamp())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to update recovery codes");
                StorageError::Database("Failed to update recovery codes".to_string())
            })?;

        Ok(())
    }
}
