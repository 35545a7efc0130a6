//! Repository implementations for SQLite storage

pub mod audit_log;
pub mod card;
pub mod login_attempt;
pub mod magic_link;
pub mod trusted_device;
pub mod two_factor;
pub mod user;

pub use audit_log::SqliteAuditLogRepository;
pub use card::SqliteCardRepository;
pub use login_attempt::SqliteLoginAttemptRepository;
pub use magic_link::SqliteMagicLinkRepository;
pub use trusted_device::SqliteTrustedDeviceRepository;
pub use two_factor::SqliteTwoFactorRepository;
pub use user::SqliteUserRepository;

use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use taglink_core::{
    Error,
    error::StorageError,
    repositories::{
        AuditLogRepositoryProvider, CardRepositoryProvider, LoginAttemptRepositoryProvider,
        MagicLinkRepositoryProvider, RepositoryProvider, TrustedDeviceRepositoryProvider,
        TwoFactorRepositoryProvider, UserRepositoryProvider,
    },
};

/// Repository provider implementation for SQLite
///
/// Implements all the individual repository provider traits as well as the
/// unified [`RepositoryProvider`] trait.
pub struct SqliteRepositoryProvider {
    pool: SqlitePool,
    user: Arc<SqliteUserRepository>,
    login_attempt: Arc<SqliteLoginAttemptRepository>,
    two_factor: Arc<SqliteTwoFactorRepository>,
    magic_link: Arc<SqliteMagicLinkRepository>,
    trusted_device: Arc<SqliteTrustedDeviceRepository>,
    card: Arc<SqliteCardRepository>,
    audit_log: Arc<SqliteAuditLogRepository>,
}

impl SqliteRepositoryProvider {
    pub fn new(pool: SqlitePool) -> Self {
        let user = Arc::new(SqliteUserRepository::new(pool.clone()));
        let login_attempt = Arc::new(SqliteLoginAttemptRepository::new(pool.clone()));
        let two_factor = Arc::new(SqliteTwoFactorRepository::new(pool.clone()));
        let magic_link = Arc::new(SqliteMagicLinkRepository::new(pool.clone()));
        let trusted_device = Arc::new(SqliteTrustedDeviceRepository::new(pool.clone()));
        let card = Arc::new(SqliteCardRepository::new(pool.clone()));
        let audit_log = Arc::new(SqliteAuditLogRepository::new(pool.clone()));

        Self {
            pool,
            user,
            login_attempt,
            two_factor,
            magic_link,
            trusted_device,
            card,
            audit_log,
        }
    }

    /// Connect to the given database URL and build a provider.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let pool = SqlitePool::connect(url).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to database");
            Error::Storage(StorageError::Connection(
                "Failed to connect to database".to_string(),
            ))
        })?;

        Ok(Self::new(pool))
    }
}

// Implement individual provider traits

impl UserRepositoryProvider for SqliteRepositoryProvider {
    type UserRepo = SqliteUserRepository;

    fn user(&self) -> &Self::UserRepo {
        &self.user
    }
}

impl LoginAttemptRepositoryProvider for SqliteRepositoryProvider {
    type LoginAttemptRepo = SqliteLoginAttemptRepository;

    fn login_attempt(&self) -> &Self::LoginAttemptRepo {
        &self.login_attempt
    }
}

impl TwoFactorRepositoryProvider for SqliteRepositoryProvider {
    type TwoFactorRepo = SqliteTwoFactorRepository;

    fn two_factor(&self) -> &Self::TwoFactorRepo {
        &self.two_factor
    }
}

impl MagicLinkRepositoryProvider for SqliteRepositoryProvider {
    type MagicLinkRepo = SqliteMagicLinkRepository;

    fn magic_link(&self) -> &Self::MagicLinkRepo {
        &self.magic_link
    }
}

impl TrustedDeviceRepositoryProvider for SqliteRepositoryProvider {
    type TrustedDeviceRepo = SqliteTrustedDeviceRepository;

    fn trusted_device(&self) -> &Self::TrustedDeviceRepo {
        &self.trusted_device
    }
}

impl CardRepositoryProvider for SqliteRepositoryProvider {
    type CardRepo = SqliteCardRepository;

    fn card(&self) -> &Self::CardRepo {
        &self.card
    }
}

impl AuditLogRepositoryProvider for SqliteRepositoryProvider {
    type AuditLogRepo = SqliteAuditLogRepository;

    fn audit_log(&self) -> &Self::AuditLogRepo {
        &self.audit_log
    }
}

// Implement the unified RepositoryProvider trait

#[async_trait]
impl RepositoryProvider for SqliteRepositoryProvider {
    async fn migrate(&self) -> Result<(), Error> {
        crate::MIGRATOR.run(&self.pool).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to run migrations");
            Error::Storage(StorageError::Migration(
                "Failed to run migrations".to_string(),
            ))
        })
    }

    async fn health_check(&self) -> Result<(), Error> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Storage(StorageError::Database(e.to_string())))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrate_and_health_check() {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create pool");
        let provider = SqliteRepositoryProvider::new(pool);

        provider.migrate().await.unwrap();
        // Migrations are idempotent
        provider.migrate().await.unwrap();
        provider.health_check().await.unwrap();
    }
}
