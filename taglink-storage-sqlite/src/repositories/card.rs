//! SQLite implementation of the card repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use taglink_core::{
    Error, UserId,
    error::StorageError,
    repositories::CardRepository,
    storage::{Card, CardId, CardWithOwner, NewCard},
};

pub struct SqliteCardRepository {
    pool: SqlitePool,
}

impl SqliteCardRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Internal struct for query results
#[derive(Debug, sqlx::FromRow)]
struct SqliteCard {
    id: String,
    uid: String,
    link: String,
    user_id: String,
    created_at: i64,
}

impl From<SqliteCard> for Card {
    fn from(row: SqliteCard) -> Self {
        Card {
            id: CardId::new(&row.id),
            uid: row.uid,
            link: row.link,
            user_id: UserId::new(&row.user_id),
            created_at: DateTime::from_timestamp(row.created_at, 0).expect("Invalid timestamp"),
        }
    }
}

/// Internal struct for the owner join
#[derive(Debug, sqlx::FromRow)]
struct SqliteCardWithOwner {
    id: String,
    uid: String,
    link: String,
    user_id: String,
    created_at: i64,
    owner_name: String,
    owner_email: String,
}

impl From<SqliteCardWithOwner> for CardWithOwner {
    fn from(row: SqliteCardWithOwner) -> Self {
        CardWithOwner {
            card: Card {
                id: CardId::new(&row.id),
                uid: row.uid,
                link: row.link,
                user_id: UserId::new(&row.user_id),
                created_at: DateTime::from_timestamp(row.created_at, 0)
                    .expect("Invalid timestamp"),
            },
            owner_name: row.owner_name,
            owner_email: row.owner_email,
        }
    }
}

#[async_trait]
impl CardRepository for SqliteCardRepository {
    async fn create(&self, id: CardId, card: NewCard) -> Result<Card, Error> {
        let now = Utc::now().timestamp();

        let row = sqlx::query_as::<_, SqliteCard>(
            r#"
            INSERT INTO cards (id, uid, link, user_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id, uid, link, user_id, created_at
            "#,
        )
        .bind(id.as_str())
        .bind(&card.uid)
        .bind(&card.link)
        .bind(card.user_id.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create card");
            StorageError::Database("Failed to create card".to_string())
        })?;

        Ok(row.into())
    }

    async fn list(&self, user_id: Option<&UserId>) -> Result<Vec<CardWithOwner>, Error> {
        let rows = sqlx::query_as::<_, SqliteCardWithOwner>(
            r#"
            SELECT c.id, c.uid, c.link, c.user_id, c.created_at,
                   u.name AS owner_name, u.email AS owner_email
            FROM cards c
            JOIN users u ON u.id = c.user_id
            WHERE (?1 IS NULL OR c.user_id = ?1)
            ORDER BY c.created_at DESC
            "#,
        )
        .bind(user_id.map(|id| id.as_str().to_string()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list cards");
            StorageError::Database("Failed to list cards".to_string())
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete(&self, id: &CardId) -> Result<u64, Error> {
        let result = sqlx::query("DELETE FROM cards WHERE id = ?1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to delete card");
                StorageError::Database("Failed to delete card".to_string())
            })?;

        Ok(result.rows_affected())
    }
}
