use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use taglink_core::{
    Error, User, UserId, error::StorageError, repositories::UserRepository, user::NewUser,
};

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Internal struct for query results
#[derive(Debug, sqlx::FromRow)]
struct SqliteUser {
    id: String,
    name: String,
    email: String,
    created_at: i64,
    updated_at: i64,
}

impl From<SqliteUser> for User {
    fn from(row: SqliteUser) -> Self {
        User {
            id: UserId::new(&row.id),
            name: row.name,
            email: row.email,
            created_at: DateTime::from_timestamp(row.created_at, 0).expect("Invalid timestamp"),
            updated_at: DateTime::from_timestamp(row.updated_at, 0).expect("Invalid timestamp"),
        }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, user: NewUser) -> Result<User, Error> {
        let now = Utc::now().timestamp();

        let row = sqlx::query_as::<_, SqliteUser>(
            r#"
            INSERT INTO users (id, name, email, password_hash, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            RETURNING id, name, email, created_at, updated_at
            "#,
        )
        .bind(user.id.as_str())
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to create user");
            StorageError::Database("Failed to create user".to_string())
        })?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error> {
        let row = sqlx::query_as::<_, SqliteUser>(
            "SELECT id, name, email, created_at, updated_at FROM users WHERE id = ?1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to find user by id");
            StorageError::Database("Failed to find user".to_string())
        })?;

        Ok(row.map(Into::into))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let row = sqlx::query_as::<_, SqliteUser>(
            "SELECT id, name, email, created_at, updated_at FROM users WHERE email = ?1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to find user by email");
            StorageError::Database("Failed to find user".to_string())
        })?;

        Ok(row.map(Into::into))
    }

    async fn password_hash(&self, id: &UserId) -> Result<Option<String>, Error> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT password_hash FROM users WHERE id = ?1")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    tracing::error!(error = %e, "Failed to fetch password hash");
                    StorageError::Database("Failed to fetch password hash".to_string())
                })?;

        Ok(row.map(|(hash,)| hash))
    }

    async fn list(&self) -> Result<Vec<User>, Error> {
        let rows = sqlx::query_as::<_, SqliteUser>(
            "SELECT id, name, email, created_at, updated_at FROM users ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to list users");
            StorageError::Database("Failed to list users".to_string())
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::setup_test_db;

    #[tokio::test]
    async fn test_create_and_find_user() {
        let pool = setup_test_db().await;
        let repo = SqliteUserRepository::new(pool);

        let created = repo
            .create(NewUser::new(
                "Ada".to_string(),
                "ada@example.com".to_string(),
                "hash".to_string(),
            ))
            .await
            .unwrap();

        let by_id = repo.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "ada@example.com");
        assert_eq!(by_id.name, "Ada");

        let by_email = repo.find_by_email("ada@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);

        assert!(repo.find_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let pool = setup_test_db().await;
        let repo = SqliteUserRepository::new(pool);

        repo.create(NewUser::new(
            "Ada".to_string(),
            "ada@example.com".to_string(),
            "hash".to_string(),
        ))
        .await
        .unwrap();

        let result = repo
            .create(NewUser::new(
                "Imposter".to_string(),
                "ada@example.com".to_string(),
                "other-hash".to_string(),
            ))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_password_hash_not_in_profile() {
        let pool = setup_test_db().await;
        let repo = SqliteUserRepository::new(pool);

        let user = repo
            .create(NewUser::new(
                "Ada".to_string(),
                "ada@example.com".to_string(),
                "secret-hash".to_string(),
            ))
            .await
            .unwrap();

        let hash = repo.password_hash(&user.id).await.unwrap();
        assert_eq!(hash.as_deref(), Some("secret-hash"));

        let unknown = repo.password_hash(&UserId::new("usr_missing")).await.unwrap();
        assert!(unknown.is_none());
    }

    #[tokio::test]
    async fn test_list_users() {
        let pool = setup_test_db().await;
        let repo = SqliteUserRepository::new(pool);

        for i in 0..3 {
            repo.create(NewUser::new(
                format!("User {i}"),
                format!("user{i}@example.com"),
                "hash".to_string(),
            ))
            .await
            .unwrap();
        }

        let users = repo.list().await.unwrap();
        assert_eq!(users.len(), 3);
    }
}
