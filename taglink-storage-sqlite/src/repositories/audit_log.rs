//! SQLite implementation of the audit log repository.
//!
//! The optional filters are expressed as `(?N IS NULL OR column = ?N)`
//! predicates so one static statement covers every filter combination.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use taglink_core::{
    Error, UserId,
    error::StorageError,
    repositories::AuditLogRepository,
    storage::{AuditLogEntry, AuditLogPage, AuditLogQuery, NewAuditLogEntry},
};

pub struct SqliteAuditLogRepository {
    pool: SqlitePool,
}

impl SqliteAuditLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Internal struct for query results
#[derive(Debug, sqlx::FromRow)]
struct SqliteAuditLogEntry {
    id: i64,
    user_id: String,
    action: String,
    entity: String,
    entity_id: Option<String>,
    details: Option<String>,
    source_address: String,
    user_agent: Option<String>,
    created_at: i64,
}

impl From<SqliteAuditLogEntry> for AuditLogEntry {
    fn from(row: SqliteAuditLogEntry) -> Self {
        AuditLogEntry {
            id: row.id,
            user_id: UserId::new(&row.user_id),
            action: row.action,
            entity: row.entity,
            entity_id: row.entity_id,
            details: row.details.and_then(|d| serde_json::from_str(&d).ok()),
            source_address: row.source_address,
            user_agent: row.user_agent,
            created_at: DateTime::from_timestamp(row.created_at, 0).expect("Invalid timestamp"),
        }
    }
}

#[async_trait]
impl AuditLogRepository for SqliteAuditLogRepository {
    async fn record(&self, entry: NewAuditLogEntry) -> Result<AuditLogEntry, Error> {
        let now = Utc::now().timestamp();
        let details = entry
            .details
            .as_ref()
            .map(|d| d.to_string());

        let row = sqlx::query_as::<_, SqliteAuditLogEntry>(
            r#"
            INSERT INTO audit_logs
                (user_id, action, entity, entity_id, details, source_address, user_agent, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            RETURNING id, user_id, action, entity, entity_id, details, source_address, user_agent, created_at
            "#,
        )
        .bind(entry.user_id.as_str())
        .bind(&entry.action)
        .bind(&entry.entity)
        .bind(&entry.entity_id)
        .bind(&details)
        .bind(&entry.source_address)
        .bind(&entry.user_agent)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to record audit log entry");
            StorageError::Database("Failed to record audit log entry".to_string())
        })?;

        Ok(row.into())
    }

    async fn query(&self, query: &AuditLogQuery) -> Result<AuditLogPage, Error> {
        let user_id = query.user_id.as_ref().map(|id| id.as_str().to_string());
        let start = query.start_date.map(|dt| dt.timestamp());
        let end = query.end_date.map(|dt| dt.timestamp());

        let (total,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM audit_logs
            WHERE (?1 IS NULL OR user_id = ?1)
              AND (?2 IS NULL OR action = ?2)
              AND (?3 IS NULL OR entity = ?3)
              AND (?4 IS NULL OR created_at >= ?4)
              AND (?5 IS NULL OR created_at <= ?5)
            "#,
        )
        .bind(&user_id)
        .bind(&query.action)
        .bind(&query.entity)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to count audit log entries");
            StorageError::Database("Failed to count audit log entries".to_string())
        })?;

        let rows = sqlx::query_as::<_, SqliteAuditLogEntry>(
            r#"
            SELECT id, user_id, action, entity, entity_id, details, source_address, user_agent, created_at
            FROM audit_logs
            WHERE (?1 IS NULL OR user_id = ?1)
              AND (?2 IS NULL OR action = ?2)
              AND (?3 IS NULL OR entity = ?3)
              AND (?4 IS NULL OR created_at >= ?4)
              AND (?5 IS NULL OR created_at <= ?5)
            ORDER BY created_at DESC, id DESC
            LIMIT ?6 OFFSET ?7
            "#,
        )
        .bind(&user_id)
        .bind(&query.action)
        .bind(&query.entity)
        .bind(start)
        .bind(end)
        .bind(query.limit())
        .bind(query.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to query audit log");
            StorageError::Database("Failed to query audit log".to_string())
        })?;

        Ok(AuditLogPage {
            entries: rows.into_iter().map(Into::into).collect(),
            total: total as u64,
            limit: query.limit(),
            offset: query.offset(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{create_test_user, setup_test_db};
    use serde_json::json;
    use taglink_core::storage::ClientInfo;

    fn client() -> ClientInfo {
        ClientInfo::new("203.0.113.9", Some("test-agent".to_string()))
    }

    #[tokio::test]
    async fn test_record_and_query() {
        let pool = setup_test_db().await;
        let user_id = create_test_user(&pool, "a@example.com").await;
        let repo = SqliteAuditLogRepository::new(pool);

        let entry = repo
            .record(
                NewAuditLogEntry::new(user_id.clone(), "magic_link_created", "magic_links", &client())
                    .with_details(json!({ "email": "a@example.com" })),
            )
            .await
            .unwrap();
        assert!(entry.id > 0);
        assert_eq!(entry.details, Some(json!({ "email": "a@example.com" })));

        let page = repo.query(&AuditLogQuery::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].action, "magic_link_created");
    }

    #[tokio::test]
    async fn test_query_filters() {
        let pool = setup_test_db().await;
        let first = create_test_user(&pool, "a@example.com").await;
        let second = create_test_user(&pool, "b@example.com").await;
        let repo = SqliteAuditLogRepository::new(pool);

        repo.record(NewAuditLogEntry::new(
            first.clone(),
            "magic_link_created",
            "magic_links",
            &client(),
        ))
        .await
        .unwrap();
        repo.record(NewAuditLogEntry::new(
            second.clone(),
            "add_trusted_device",
            "trusted_devices",
            &client(),
        ))
        .await
        .unwrap();

        let by_user = repo
            .query(&AuditLogQuery {
                user_id: Some(first),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_user.total, 1);
        assert_eq!(by_user.entries[0].action, "magic_link_created");

        let by_action = repo
            .query(&AuditLogQuery {
                action: Some("add_trusted_device".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_action.total, 1);

        let by_entity = repo
            .query(&AuditLogQuery {
                entity: Some("magic_links".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_entity.total, 1);
    }

    #[tokio::test]
    async fn test_query_pagination() {
        let pool = setup_test_db().await;
        let user_id = create_test_user(&pool, "a@example.com").await;
        let repo = SqliteAuditLogRepository::new(pool);

        for i in 0..5 {
            repo.record(
                NewAuditLogEntry::new(user_id.clone(), "action", "entity", &client())
                    .with_entity_id(format!("entity-{i}")),
            )
            .await
            .unwrap();
        }

        let page = repo
            .query(&AuditLogQuery {
                limit: Some(2),
                offset: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(page.total, 5);
        assert_eq!(page.entries.len(), 2);
        assert_eq!(page.limit, 2);
        assert_eq!(page.offset, 2);
        // Newest first: offset 2 of five entries 4,3,2,1,0 -> 2,1
        assert_eq!(page.entries[0].entity_id.as_deref(), Some("entity-2"));
    }
}
