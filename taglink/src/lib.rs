//! # Taglink
//!
//! Taglink is the backend for a browser-based NFC tag manager: users register
//! and log in, associate a URL with a tag's unique identifier, and manage a
//! personal list of tags. The authentication surface carries a source-address
//! rate limiter, an optional TOTP second factor with single-use recovery
//! codes, magic links and trusted devices, with every auth-relevant action
//! recorded in login-attempt and audit trails.
//!
//! [`Taglink`] is the central coordinator: it wires the service layer from
//! `taglink-core` over any storage backend implementing
//! [`RepositoryProvider`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use taglink::Taglink;
//! use taglink_storage_sqlite::SqliteRepositoryProvider;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
//!     let repositories = Arc::new(SqliteRepositoryProvider::new(pool));
//!
//!     let taglink = Taglink::new(repositories);
//! }
//! ```

use std::sync::Arc;

use taglink_core::{
    RepositoryProvider,
    repositories::{
        AuditLogRepositoryAdapter, CardRepositoryAdapter, LoginAttemptRepositoryAdapter,
        MagicLinkRepositoryAdapter, TrustedDeviceRepositoryAdapter, TwoFactorRepositoryAdapter,
        UserRepositoryAdapter,
    },
    services::{
        AuditService, CardService, LoginService, MagicLinkService, TrustedDeviceService,
        TwoFactorService, UserService,
    },
    storage::RateLimitConfig,
};

/// Re-export core types commonly used when working with the Taglink API.
pub use taglink_core::{
    Error, User, UserId,
    services::{Enrollment, IssuedMagicLink, LoginCredentials, LoginOutcome, UserProfile},
    storage::{
        AuditLogEntry, AuditLogPage, AuditLogQuery, Card, CardId, CardWithOwner, ClientInfo,
        NewAuditLogEntry, NewCard, TrustedDevice,
    },
};

/// Re-export storage backends available when the corresponding feature is
/// enabled.
#[cfg(feature = "sqlite")]
pub use taglink_storage_sqlite::SqliteRepositoryProvider;

/// Configuration for a Taglink instance.
#[derive(Debug, Clone)]
pub struct TaglinkConfig {
    /// Login rate limiter window and threshold
    pub rate_limit: RateLimitConfig,
    /// Issuer embedded in TOTP provisioning URIs
    pub two_factor_issuer: String,
    /// Base URL magic-link login URLs are built from
    pub app_url: String,
}

impl Default for TaglinkConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimitConfig::default(),
            two_factor_issuer: "Taglink".to_string(),
            app_url: "http://localhost:3000".to_string(),
        }
    }
}

type Users<R> = UserService<UserRepositoryAdapter<R>>;
type Login<R> = LoginService<
    UserRepositoryAdapter<R>,
    LoginAttemptRepositoryAdapter<R>,
    TwoFactorRepositoryAdapter<R>,
>;
type TwoFactor<R> = TwoFactorService<TwoFactorRepositoryAdapter<R>>;
type MagicLinks<R> = MagicLinkService<
    UserRepositoryAdapter<R>,
    MagicLinkRepositoryAdapter<R>,
    LoginAttemptRepositoryAdapter<R>,
    AuditLogRepositoryAdapter<R>,
>;
type TrustedDevices<R> =
    TrustedDeviceService<TrustedDeviceRepositoryAdapter<R>, AuditLogRepositoryAdapter<R>>;
type Cards<R> = CardService<CardRepositoryAdapter<R>>;
type Audit<R> = AuditService<AuditLogRepositoryAdapter<R>>;

/// The central coordinator wiring services over a repository provider.
///
/// `Taglink` owns one instance of every service, each talking to the same
/// storage backend through repository adapters. Construct it once at startup
/// and share it behind an `Arc`.
pub struct Taglink<R: RepositoryProvider> {
    repositories: Arc<R>,
    users: Arc<Users<R>>,
    login: Arc<Login<R>>,
    two_factor: Arc<TwoFactor<R>>,
    magic_links: Arc<MagicLinks<R>>,
    trusted_devices: Arc<TrustedDevices<R>>,
    cards: Arc<Cards<R>>,
    audit: Arc<Audit<R>>,
}

impl<R: RepositoryProvider> Taglink<R> {
    /// Create a new Taglink instance with default configuration.
    pub fn new(repositories: Arc<R>) -> Self {
        Self::with_config(repositories, TaglinkConfig::default())
    }

    /// Create a new Taglink instance with the given configuration.
    pub fn with_config(repositories: Arc<R>, config: TaglinkConfig) -> Self {
        let users_repo = Arc::new(UserRepositoryAdapter::new(repositories.clone()));
        let attempts_repo = Arc::new(LoginAttemptRepositoryAdapter::new(repositories.clone()));
        let two_factor_repo = Arc::new(TwoFactorRepositoryAdapter::new(repositories.clone()));
        let magic_link_repo = Arc::new(MagicLinkRepositoryAdapter::new(repositories.clone()));
        let device_repo = Arc::new(TrustedDeviceRepositoryAdapter::new(repositories.clone()));
        let card_repo = Arc::new(CardRepositoryAdapter::new(repositories.clone()));
        let audit_repo = Arc::new(AuditLogRepositoryAdapter::new(repositories.clone()));

        Self {
            repositories,
            users: Arc::new(UserService::new(users_repo.clone())),
            login: Arc::new(LoginService::new(
                users_repo.clone(),
                attempts_repo.clone(),
                two_factor_repo.clone(),
                config.rate_limit,
            )),
            two_factor: Arc::new(TwoFactorService::new(
                two_factor_repo,
                config.two_factor_issuer,
            )),
            magic_links: Arc::new(MagicLinkService::new(
                users_repo,
                magic_link_repo,
                attempts_repo,
                audit_repo.clone(),
                config.app_url,
            )),
            trusted_devices: Arc::new(TrustedDeviceService::new(device_repo, audit_repo.clone())),
            cards: Arc::new(CardService::new(card_repo)),
            audit: Arc::new(AuditService::new(audit_repo)),
        }
    }

    /// Run migrations for all repositories.
    pub async fn migrate(&self) -> Result<(), Error> {
        self.repositories.migrate().await
    }

    /// Health check for all repositories.
    pub async fn health_check(&self) -> Result<(), Error> {
        self.repositories.health_check().await
    }

    /// User registration and lookup.
    pub fn users(&self) -> &Users<R> {
        &self.users
    }

    /// The login sequence.
    pub fn login(&self) -> &Login<R> {
        &self.login
    }

    /// Second-factor enrollment, confirmation and recovery codes.
    pub fn two_factor(&self) -> &TwoFactor<R> {
        &self.two_factor
    }

    /// Magic link issuance and redemption.
    pub fn magic_links(&self) -> &MagicLinks<R> {
        &self.magic_links
    }

    /// Trusted device registration and validation.
    pub fn trusted_devices(&self) -> &TrustedDevices<R> {
        &self.trusted_devices
    }

    /// Card management.
    pub fn cards(&self) -> &Cards<R> {
        &self.cards
    }

    /// Audit trail access.
    pub fn audit(&self) -> &Audit<R> {
        &self.audit
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;

    async fn taglink() -> Taglink<SqliteRepositoryProvider> {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create pool");
        let taglink = Taglink::new(Arc::new(SqliteRepositoryProvider::new(pool)));
        taglink.migrate().await.expect("Failed to migrate");
        taglink
    }

    fn client() -> ClientInfo {
        ClientInfo::new("203.0.113.9", Some("test-agent".to_string()))
    }

    #[tokio::test]
    async fn test_register_and_login_end_to_end() {
        let taglink = taglink().await;

        let user = taglink
            .users()
            .register("Ada", "ada@example.com", "analytical-engine")
            .await
            .unwrap();

        let outcome = taglink
            .login()
            .login(
                &LoginCredentials {
                    email: "ada@example.com".to_string(),
                    password: "analytical-engine".to_string(),
                    one_time_code: None,
                },
                &client(),
            )
            .await
            .unwrap();

        match outcome {
            LoginOutcome::Success {
                user: profile,
                second_factor_enabled,
            } => {
                assert_eq!(profile.id, user.id);
                assert!(!second_factor_enabled);
            }
            other => panic!("Expected Success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_card_round_trip_end_to_end() {
        let taglink = taglink().await;

        let user = taglink
            .users()
            .register("Ada", "ada@example.com", "analytical-engine")
            .await
            .unwrap();

        let card = taglink
            .cards()
            .create(NewCard {
                uid: "T1".to_string(),
                link: "https://x".to_string(),
                user_id: user.id.clone(),
            })
            .await
            .unwrap();

        let listed = taglink.cards().list(Some(&user.id)).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].card.uid, "T1");
        assert_eq!(listed[0].owner_name, "Ada");

        taglink.cards().delete(&card.id).await.unwrap();
        assert!(taglink.cards().list(Some(&user.id)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_magic_link_end_to_end() {
        let taglink = taglink().await;

        let user = taglink
            .users()
            .register("Ada", "ada@example.com", "analytical-engine")
            .await
            .unwrap();

        let issued = taglink
            .magic_links()
            .issue("ada@example.com", &client())
            .await
            .unwrap();

        let profile = taglink
            .magic_links()
            .redeem(&issued.token, &client())
            .await
            .unwrap();
        assert_eq!(profile.id, user.id);

        // Single use
        assert!(
            taglink
                .magic_links()
                .redeem(&issued.token, &client())
                .await
                .is_err()
        );

        // The audit trail has the issuance and the login
        let page = taglink
            .audit()
            .query(&AuditLogQuery {
                user_id: Some(user.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 2);
    }
}
