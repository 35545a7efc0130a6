//! SQLite implementation of the magic link repository.
//!
//! Redemption is a single conditional UPDATE: the token row is marked used
//! only while it is still unused and unexpired, and the updated row is
//! returned in the same statement. Two concurrent redemptions of one token
//! cannot both observe `used = 0`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use taglink_core::{
    Error, UserId,
    error::StorageError,
    repositories::MagicLinkRepository,
    storage::{MagicLink, NewMagicLink},
};

pub struct SqliteMagicLinkRepository {
    pool: SqlitePool,
}

impl SqliteMagicLinkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Internal struct for query results
#[derive(Debug, sqlx::FromRow)]
struct SqliteMagicLink {
    id: i64,
    user_id: String,
    token: String,
    used: bool,
    expires_at: i64,
    created_at: i64,
}

impl From<SqliteMagicLink> for MagicLink {
    fn from(row: SqliteMagicLink) -> Self {
        MagicLink {
            id: row.id,
            user_id: UserId::new(&row.user_id),
            token: row.token,
            used: row.used,
            expires_at: DateTime::from_timestamp(row.expires_at, 0).expect("Invalid timestamp"),
            created_at: DateTime::from_timestamp(row.created_at, 0).expect("Invalid timestamp"),
        }
    }
}

#[async_trait]
impl MagicLinkRepository for SqliteMagicLinkRepository {
    async fn create(&self, link: NewMagicLink) -> Result<MagicLink, Error> {
        let now = Utc::now().timestamp();

        let row = sqlx::query_as::<_, SqliteMagicLink>(
            r#"
            INSERT INTO magic_links (user_id, token, used, expires_at, created_at)
            VALUES (?1, ?2, 0, ?3, ?4)
            RETURNING id, user_id, token, used, expires_at, created_at
            "#,
        )
        .bind(link.user_id.as_str())
        .bind(&link.token)
        .bind(link.expires_at.timestamp())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to store magic link");
            StorageError::Database("Failed to store magic link".to_string())
        })?;

        Ok(row.into())
    }

    async fn consume(&self, token: &str, now: DateTime<Utc>) -> Result<Option<MagicLink>, Error> {
        let row = sqlx::query_as::<_, SqliteMagicLink>(
            r#"
            UPDATE magic_links
            SET used = 1
            WHERE token = ?1 AND used = 0 AND expires_at > ?2
            RETURNING id, user_id, token, used, expires_at, created_at
            "#,
        )
        .bind(token)
        .bind(now.timestamp())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to consume magic link");
            StorageError::Database("Failed to consume magic link".to_string())
        })?;

        Ok(row.map(Into::into))
    }
}
