//! SQLite storage backend for taglink
//!
//! Implements every repository trait from `taglink-core` on top of a
//! [`sqlx::SqlitePool`]. Timestamps are stored as unix-seconds integers and
//! recovery codes / audit details as JSON text columns. Migrations are
//! embedded with [`sqlx::migrate!`].

pub mod repositories;

pub use repositories::{
    SqliteAuditLogRepository, SqliteCardRepository, SqliteLoginAttemptRepository,
    SqliteMagicLinkRepository, SqliteRepositoryProvider, SqliteTrustedDeviceRepository,
    SqliteTwoFactorRepository, SqliteUserRepository,
};

/// Embedded schema migrations for the SQLite backend.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
