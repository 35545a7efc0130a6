//! Repository traits for the data access layer
//!
//! This module defines the repository interfaces that services use to
//! interact with storage. These traits provide a clean abstraction over the
//! underlying storage implementation.
//!
//! # Trait Hierarchy
//!
//! - Individual `*Repository` traits define the operations for each data domain
//! - Individual `*RepositoryProvider` traits provide access to each repository type
//! - [`RepositoryProvider`] is a supertrait combining all provider traits plus
//!   lifecycle methods
//!
//! This design allows storage backends to implement only the repositories
//! they need and share repository implementations across backend types.

pub mod adapter;
pub mod audit_log;
pub mod card;
pub mod login_attempt;
pub mod magic_link;
pub mod trusted_device;
pub mod two_factor;
pub mod user;

pub use adapter::{
    AuditLogRepositoryAdapter, CardRepositoryAdapter, LoginAttemptRepositoryAdapter,
    MagicLinkRepositoryAdapter, TrustedDeviceRepositoryAdapter, TwoFactorRepositoryAdapter,
    UserRepositoryAdapter,
};
pub use audit_log::AuditLogRepository;
pub use card::CardRepository;
pub use login_attempt::LoginAttemptRepository;
pub use magic_link::MagicLinkRepository;
pub use trusted_device::TrustedDeviceRepository;
pub use two_factor::TwoFactorRepository;
pub use user::UserRepository;

use async_trait::async_trait;

use crate::Error;

// ============================================================================
// Individual Repository Provider Traits
// ============================================================================

/// Provider trait for user repository access.
pub trait UserRepositoryProvider: Send + Sync + 'static {
    /// The user repository implementation type
    type UserRepo: UserRepository;

    /// Get the user repository
    fn user(&self) -> &Self::UserRepo;
}

/// Provider trait for login attempt repository access.
pub trait LoginAttemptRepositoryProvider: Send + Sync + 'static {
    /// The login attempt repository implementation type
    type LoginAttemptRepo: LoginAttemptRepository;

    /// Get the login attempt repository
    fn login_attempt(&self) -> &Self::LoginAttemptRepo;
}

/// Provider trait for second-factor repository access.
pub trait TwoFactorRepositoryProvider: Send + Sync + 'static {
    /// The second-factor repository implementation type
    type TwoFactorRepo: TwoFactorRepository;

    /// Get the second-factor repository
    fn two_factor(&self) -> &Self::TwoFactorRepo;
}

/// Provider trait for magic link repository access.
pub trait MagicLinkRepositoryProvider: Send + Sync + 'static {
    /// The magic link repository implementation type
    type MagicLinkRepo: MagicLinkRepository;

    /// Get the magic link repository
    fn magic_link(&self) -> &Self::MagicLinkRepo;
}

/// Provider trait for trusted device repository access.
pub trait TrustedDeviceRepositoryProvider: Send + Sync + 'static {
    /// The trusted device repository implementation type
    type TrustedDeviceRepo: TrustedDeviceRepository;

    /// Get the trusted device repository
    fn trusted_device(&self) -> &Self::TrustedDeviceRepo;
}

/// Provider trait for card repository access.
pub trait CardRepositoryProvider: Send + Sync + 'static {
    /// The card repository implementation type
    type CardRepo: CardRepository;

    /// Get the card repository
    fn card(&self) -> &Self::CardRepo;
}

/// Provider trait for audit log repository access.
pub trait AuditLogRepositoryProvider: Send + Sync + 'static {
    /// The audit log repository implementation type
    type AuditLogRepo: AuditLogRepository;

    /// Get the audit log repository
    fn audit_log(&self) -> &Self::AuditLogRepo;
}

// ============================================================================
// Unified Repository Provider Trait
// ============================================================================

/// Provider trait that storage implementations must implement to provide all
/// repositories.
///
/// This trait is a supertrait combining all individual repository provider
/// traits, plus lifecycle methods for migrations and health checks.
#[async_trait]
pub trait RepositoryProvider:
    UserRepositoryProvider
    + LoginAttemptRepositoryProvider
    + TwoFactorRepositoryProvider
    + MagicLinkRepositoryProvider
    + TrustedDeviceRepositoryProvider
    + CardRepositoryProvider
    + AuditLogRepositoryProvider
{
    /// Run migrations for all repositories
    async fn migrate(&self) -> Result<(), Error>;

    /// Health check for all repositories
    async fn health_check(&self) -> Result<(), Error>;
}
