//! Adapters that bridge a [`RepositoryProvider`] to the individual repository
//! traits, so services stay generic over single repositories and can be unit
//! tested against in-memory mocks.

use crate::{
    Error, User, UserId,
    repositories::{
        AuditLogRepository, CardRepository, LoginAttemptRepository, MagicLinkRepository,
        RepositoryProvider, TrustedDeviceRepository, TwoFactorRepository, UserRepository,
    },
    storage::{
        AuditLogEntry, AuditLogPage, AuditLogQuery, Card, CardId, CardWithOwner, LoginAttempt,
        MagicLink, NewAuditLogEntry, NewCard, NewLoginAttempt, NewMagicLink, NewTrustedDevice,
        NewTwoFactorRecord, TrustedDevice, TwoFactorRecord,
    },
    user::NewUser,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Adapter that wraps a RepositoryProvider and implements [`UserRepository`]
pub struct UserRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> UserRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> UserRepository for UserRepositoryAdapter<R> {
    async fn create(&self, user: NewUser) -> Result<User, Error> {
        self.provider.user().create(user).await
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error> {
        self.provider.user().find_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        self.provider.user().find_by_email(email).await
    }

    async fn password_hash(&self, id: &UserId) -> Result<Option<String>, Error> {
        self.provider.user().password_hash(id).await
    }

    async fn list(&self) -> Result<Vec<User>, Error> {
        self.provider.user().list().await
    }
}

pub struct LoginAttemptRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> LoginAttemptRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> LoginAttemptRepository for LoginAttemptRepositoryAdapter<R> {
    async fn record(&self, attempt: NewLoginAttempt) -> Result<LoginAttempt, Error> {
        self.provider.login_attempt().record(attempt).await
    }

    async fn count_recent_failures(
        &self,
        source_address: &str,
        since: DateTime<Utc>,
    ) -> Result<u32, Error> {
        self.provider
            .login_attempt()
            .count_recent_failures(source_address, since)
            .await
    }
}

pub struct TwoFactorRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> TwoFactorRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> TwoFactorRepository for TwoFactorRepositoryAdapter<R> {
    async fn create(&self, record: NewTwoFactorRecord) -> Result<TwoFactorRecord, Error> {
        self.provider.two_factor().create(record).await
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<TwoFactorRecord>, Error> {
        self.provider.two_factor().find_by_user(user_id).await
    }

    async fn set_enabled(&self, user_id: &UserId, enabled: bool) -> Result<(), Error> {
        self.provider.two_factor().set_enabled(user_id, enabled).await
    }

    async fn update_recovery_codes(
        &self,
        user_id: &UserId,
        codes: &[String],
    ) -> Result<(), Error> {
        self.provider
            .two_factor()
            .update_recovery_codes(user_id, codes)
            .await
    }
}

pub struct MagicLinkRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> MagicLinkRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> MagicLinkRepository for MagicLinkRepositoryAdapter<R> {
    async fn create(&self, link: NewMagicLink) -> Result<MagicLink, Error> {
        self.provider.magic_link().create(link).await
    }

    async fn consume(&self, token: &str, now: DateTime<Utc>) -> Result<Option<MagicLink>, Error> {
        self.provider.magic_link().consume(token, now).await
    }
}

pub struct TrustedDeviceRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> TrustedDeviceRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> TrustedDeviceRepository for TrustedDeviceRepositoryAdapter<R> {
    async fn create(&self, device: NewTrustedDevice) -> Result<TrustedDevice, Error> {
        self.provider.trusted_device().create(device).await
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<TrustedDevice>, Error> {
        self.provider.trusted_device().list_for_user(user_id).await
    }

    async fn touch(
        &self,
        user_id: &UserId,
        device_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<TrustedDevice>, Error> {
        self.provider
            .trusted_device()
            .touch(user_id, device_id, now)
            .await
    }

    async fn remove(&self, user_id: &UserId, device_id: &str) -> Result<u64, Error> {
        self.provider.trusted_device().remove(user_id, device_id).await
    }
}

pub struct CardRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> CardRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> CardRepository for CardRepositoryAdapter<R> {
    async fn create(&self, id: CardId, card: NewCard) -> Result<Card, Error> {
        self.provider.card().create(id, card).await
    }

    async fn list(&self, user_id: Option<&UserId>) -> Result<Vec<CardWithOwner>, Error> {
        self.provider.card().list(user_id).await
    }

    async fn delete(&self, id: &CardId) -> Result<u64, Error> {
        self.provider.card().delete(id).await
    }
}

pub struct AuditLogRepositoryAdapter<R: RepositoryProvider> {
    provider: Arc<R>,
}

impl<R: RepositoryProvider> AuditLogRepositoryAdapter<R> {
    pub fn new(provider: Arc<R>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<R: RepositoryProvider> AuditLogRepository for AuditLogRepositoryAdapter<R> {
    async fn record(&self, entry: NewAuditLogEntry) -> Result<AuditLogEntry, Error> {
        self.provider.audit_log().record(entry).await
    }

    async fn query(&self, query: &AuditLogQuery) -> Result<AuditLogPage, Error> {
        self.provider.audit_log().query(query).await
    }
}
