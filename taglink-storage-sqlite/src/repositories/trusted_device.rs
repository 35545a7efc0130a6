//! SQLite implementation of the trusted device repository.
//!
//! Validation refreshes `last_used_at` with a conditional UPDATE that also
//! checks the expiry, so an expired device can never be refreshed back to
//! life. Expired rows are left in place, not purged.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use taglink_core::{
    Error, UserId,
    error::StorageError,
    repositories::TrustedDeviceRepository,
    storage::{NewTrustedDevice, TrustedDevice},
};

pub struct SqliteTrustedDeviceRepository {
    pool: SqlitePool,
}

impl SqliteTrustedDeviceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Internal struct for query results
#[derive(Debug, sqlx::FromRow)]
struct SqliteTrustedDevice {
    id: i64,
    user_id: String,
    device_id: String,
    device_name: String,
    source_address: String,
    expires_at: i64,
    last_used_at: Option<i64>,
    created_at: i64,
}

impl From<SqliteTrustedDevice> for TrustedDevice {
    fn from(row: SqliteTrustedDevice) -> Self {
        TrustedDevice {
            id: row.id,
            user_id: UserId::new(&row.user_id),
            device_id: row.device_id,
            device_name: row.device_name,
            source_address: row.source_address,
            expires_at: DateTime::from_timestamp(row.expires_at, 0).expect("Invalid timestamp"),
            last_used_at: row
                .last_used_at
                .and_then(|ts| DateTime::from_timestamp(ts, 0)),
            created_at: DateTime::from_timestamp(row.created_at, 0).expect("Invalid timestamp"),
        }
    }
}

const DEVICE_COLUMNS: &str =
    "id, user_id, device_id, device_name, source_address, expires_at, last_used_at, created_at";

#[async_trait]
impl TrustedDeviceRepository for SqliteTrustedDeviceRepository {
    async fn create(&self, device: NewTrustedDevice) -> Result<TrustedDevice, Error> {
        let now = Utc::now().timestamp();

        let row = sqlx::query_as::<_, SqliteTrustedDevice>(&format!(
            r#"
            INSERT INTO trusted_devices
                (user_id, device_id, device_name, source_address, expires_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING {DEVICE_COLUMNS}
            "#
        ))
        .bind(device.user_id.as_str())
        .bind(&device.device_id)
        .bind(&device.device_name)
        .bind(&device.source_address)
        .bind(device.expires_at.timestamp())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to register trusted device");
            StorageError::Database("Failed to register trusted device".to_string())
        })?;

        Ok(row.into())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<TrustedDevice>, Error> {
        let rows = sqlx::query_as::<_, SqliteTrustedDevice>(&format!(
            r#"
            SELECT {DEVICE_COLUMNS}
            FROM trusted_devices
            WHERE user_id = ?1
            ORDER BY last_used_at DESC
            "#
        ))
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list trusted devices");
            StorageError::Database("Failed to list trusted devices".to_string())
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn touch(
        &self,
        user_id: &UserId,
        device_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<TrustedDevice>, Error> {
        let row = sqlx::query_as::<_, SqliteTrustedDevice>(&format!(
            r#"
            UPDATE trusted_devices
            SET last_used_at = ?3
            WHERE user_id = ?1 AND device_id = ?2 AND expires_at >= ?3
            RETURNING {DEVICE_COLUMNS}
            "#
        ))
        .bind(user_id.as_str())
        .bind(device_id)
        .bind(now.timestamp())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to validate trusted device");
            StorageError::Database("Failed to validate trusted device".to_string())
        })?;

        Ok(row.map(Into::into))
    }

    async fn remove(&self, user_id: &UserId, device_id: &str) -> Result<u64, Error> {
        let result =
            sqlx::query("DELETE FROM trusted_devices WHERE user_id = ?1 AND device_id = ?2")
                .bind(user_id.as_str())
                .bind(device_id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to remove trusted device");
                    StorageError::Database("Failed to remove trusted device".to_string())
                })?;

        Ok(result.rows_affected())
    }
}
