//! Magic link issuance and redemption.
//!
//! Issuance mints a 256-bit token with a one-hour expiry. Redemption is a
//! single conditional update in the repository, so a token can never be
//! consumed twice, even by concurrent calls.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use crate::{
    Error, UserId,
    crypto::generate_secure_token,
    error::AuthError,
    repositories::{
        AuditLogRepository, LoginAttemptRepository, MagicLinkRepository, UserRepository,
    },
    services::login::UserProfile,
    storage::{ClientInfo, NewAuditLogEntry, NewLoginAttempt, NewMagicLink},
};

/// Default validity window for a freshly issued link.
const DEFAULT_EXPIRY_HOURS: i64 = 1;

/// A freshly issued magic link.
#[derive(Debug, Clone)]
pub struct IssuedMagicLink {
    pub user_id: UserId,
    pub token: String,
    /// The full login URL embedding the token
    pub url: String,
}

/// Service for magic link authentication operations
pub struct MagicLinkService<U, M, L, A>
where
    U: UserRepository,
    M: MagicLinkRepository,
    L: LoginAttemptRepository,
    A: AuditLogRepository,
{
    users: Arc<U>,
    links: Arc<M>,
    attempts: Arc<L>,
    audit: Arc<A>,
    base_url: String,
    expires_in: Duration,
}

impl<U, M, L, A> MagicLinkService<U, M, L, A>
where
    U: UserRepository,
    M: MagicLinkRepository,
    L: LoginAttemptRepository,
    A: AuditLogRepository,
{
    pub fn new(
        users: Arc<U>,
        links: Arc<M>,
        attempts: Arc<L>,
        audit: Arc<A>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            users,
            links,
            attempts,
            audit,
            base_url: base_url.into(),
            expires_in: Duration::hours(DEFAULT_EXPIRY_HOURS),
        }
    }

    /// Override the expiry window.
    pub fn with_expiry(mut self, expires_in: Duration) -> Self {
        self.expires_in = expires_in;
        self
    }

    /// Issue a magic link for the user with the given email.
    pub async fn issue(&self, email: &str, client: &ClientInfo) -> Result<IssuedMagicLink, Error> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let token = generate_secure_token();
        let expires_at = Utc::now() + self.expires_in;

        self.links
            .create(NewMagicLink {
                user_id: user.id.clone(),
                token: token.clone(),
                expires_at,
            })
            .await?;

        self.record_audit(
            NewAuditLogEntry::new(user.id.clone(), "magic_link_created", "magic_links", client)
                .with_details(json!({ "email": user.email })),
        )
        .await;

        let url = format!(
            "{}/magic-login?token={}",
            self.base_url.trim_end_matches('/'),
            token
        );

        Ok(IssuedMagicLink {
            user_id: user.id,
            token,
            url,
        })
    }

    /// Redeem a token.
    ///
    /// Consumes the token atomically; an unknown, used or expired token is
    /// rejected. On success one login attempt row and one audit entry are
    /// written.
    pub async fn redeem(&self, token: &str, client: &ClientInfo) -> Result<UserProfile, Error> {
        let link = self
            .links
            .consume(token, Utc::now())
            .await?
            .ok_or(AuthError::InvalidMagicToken)?;

        let user = self
            .users
            .find_by_id(&link.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        // The token is already consumed; a failed attempt or audit write is
        // logged but does not undo the login.
        if let Err(e) = self
            .attempts
            .record(NewLoginAttempt::success(&user.email, user.id.clone(), client))
            .await
        {
            tracing::warn!(error = %e, "Failed to record magic link login attempt");
        }

        self.record_audit(NewAuditLogEntry::new(
            user.id.clone(),
            "magic_link_login",
            "users",
            client,
        ))
        .await;

        Ok(UserProfile::from(&user))
    }

    async fn record_audit(&self, entry: NewAuditLogEntry) {
        if let Err(e) = self.audit.record(entry).await {
            tracing::warn!(error = %e, "Failed to write audit log entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::User;
    use crate::storage::{
        AuditLogEntry, AuditLogPage, AuditLogQuery, LoginAttempt, MagicLink,
    };
    use crate::user::NewUser;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockUserRepository {
        users: Mutex<Vec<User>>,
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn create(&self, new_user: NewUser) -> Result<User, Error> {
            let now = Utc::now();
            let user = User {
                id: new_user.id,
                name: new_user.name,
                email: new_user.email,
                created_at: now,
                updated_at: now,
            };
            self.users.lock().unwrap().push(user.clone());
            Ok(user)
        }

        async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|u| &u.id == id)
                .cloned())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.email == email)
                .cloned())
        }

        async fn password_hash(&self, _id: &UserId) -> Result<Option<String>, Error> {
            Ok(None)
        }

        async fn list(&self) -> Result<Vec<User>, Error> {
            Ok(self.users.lock().unwrap().clone())
        }
    }

    /// Mock with the same conditional-update semantics as the real backend.
    #[derive(Default)]
    struct MockMagicLinkRepository {
        links: Mutex<HashMap<String, MagicLink>>,
    }

    #[async_trait]
    impl MagicLinkRepository for MockMagicLinkRepository {
        async fn create(&self, link: NewMagicLink) -> Result<MagicLink, Error> {
            let mut links = self.links.lock().unwrap();
            let stored = MagicLink {
                id: links.len() as i64 + 1,
                user_id: link.user_id,
                token: link.token.clone(),
                used: false,
                expires_at: link.expires_at,
                created_at: Utc::now(),
            };
            links.insert(link.token, stored.clone());
            Ok(stored)
        }

        async fn consume(
            &self,
            token: &str,
            now: DateTime<Utc>,
        ) -> Result<Option<MagicLink>, Error> {
            let mut links = self.links.lock().unwrap();
            match links.get_mut(token) {
                Some(link) if !link.used && link.expires_at > now => {
                    link.used = true;
                    Ok(Some(link.clone()))
                }
                _ => Ok(None),
            }
        }
    }

    #[derive(Default)]
    struct MockAttemptRepository {
        attempts: Mutex<Vec<LoginAttempt>>,
    }

    #[async_trait]
    impl LoginAttemptRepository for MockAttemptRepository {
        async fn record(&self, attempt: crate::storage::NewLoginAttempt) -> Result<LoginAttempt, Error> {
            let mut attempts = self.attempts.lock().unwrap();
            let stored = LoginAttempt {
                id: attempts.len() as i64 + 1,
                email: attempt.email,
                source_address: attempt.source_address,
                user_id: attempt.user_id,
                user_agent: attempt.user_agent,
                success: attempt.success,
                blocked: attempt.blocked,
                twofa_failed: attempt.twofa_failed,
                created_at: Utc::now(),
            };
            attempts.push(stored.clone());
            Ok(stored)
        }

        async fn count_recent_failures(
            &self,
            _source_address: &str,
            _since: DateTime<Utc>,
        ) -> Result<u32, Error> {
            Ok(0)
        }
    }

    #[derive(Default)]
    struct MockAuditRepository {
        entries: Mutex<Vec<AuditLogEntry>>,
    }

    #[async_trait]
    impl AuditLogRepository for MockAuditRepository {
        async fn record(&self, entry: NewAuditLogEntry) -> Result<AuditLogEntry, Error> {
            let mut entries = self.entries.lock().unwrap();
            let stored = AuditLogEntry {
                id: entries.len() as i64 + 1,
                user_id: entry.user_id,
                action: entry.action,
                entity: entry.entity,
                entity_id: entry.entity_id,
                details: entry.details,
                source_address: entry.source_address,
                user_agent: entry.user_agent,
                created_at: Utc::now(),
            };
            entries.push(stored.clone());
            Ok(stored)
        }

        async fn query(&self, _query: &AuditLogQuery) -> Result<AuditLogPage, Error> {
            let entries = self.entries.lock().unwrap().clone();
            let total = entries.len() as u64;
            Ok(AuditLogPage {
                entries,
                total,
                limit: 50,
                offset: 0,
            })
        }
    }

    struct Fixture {
        users: Arc<MockUserRepository>,
        links: Arc<MockMagicLinkRepository>,
        attempts: Arc<MockAttemptRepository>,
        audit: Arc<MockAuditRepository>,
        service: MagicLinkService<
            MockUserRepository,
            MockMagicLinkRepository,
            MockAttemptRepository,
            MockAuditRepository,
        >,
    }

    fn fixture() -> Fixture {
        let users = Arc::new(MockUserRepository::default());
        let links = Arc::new(MockMagicLinkRepository::default());
        let attempts = Arc::new(MockAttemptRepository::default());
        let audit = Arc::new(MockAuditRepository::default());
        let service = MagicLinkService::new(
            users.clone(),
            links.clone(),
            attempts.clone(),
            audit.clone(),
            "https://tags.example.com",
        );
        Fixture {
            users,
            links,
            attempts,
            audit,
            service,
        }
    }

    fn client() -> ClientInfo {
        ClientInfo::new("203.0.113.9", Some("test-agent".to_string()))
    }

    async fn register_user(fixture: &Fixture) -> User {
        fixture
            .users
            .create(NewUser::new(
                "Test User".to_string(),
                "user@example.com".to_string(),
                "hash".to_string(),
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_issue_and_redeem() {
        let fixture = fixture();
        let user = register_user(&fixture).await;

        let issued = fixture
            .service
            .issue("user@example.com", &client())
            .await
            .unwrap();
        assert!(issued.url.contains(&issued.token));
        assert!(issued.url.starts_with("https://tags.example.com/magic-login?token="));

        let profile = fixture
            .service
            .redeem(&issued.token, &client())
            .await
            .unwrap();
        assert_eq!(profile.id, user.id);

        // One successful login attempt and two audit entries (issue + login)
        let attempts = fixture.attempts.attempts.lock().unwrap();
        assert_eq!(attempts.len(), 1);
        assert!(attempts[0].success);

        let audits = fixture.audit.entries.lock().unwrap();
        assert_eq!(audits.len(), 2);
        assert_eq!(audits[0].action, "magic_link_created");
        assert_eq!(audits[1].action, "magic_link_login");
    }

    #[tokio::test]
    async fn test_issue_for_unknown_email() {
        let fixture = fixture();

        let result = fixture.service.issue("nobody@example.com", &client()).await;
        assert!(matches!(result, Err(Error::Auth(AuthError::UserNotFound))));
    }

    #[tokio::test]
    async fn test_token_single_use() {
        let fixture = fixture();
        register_user(&fixture).await;

        let issued = fixture
            .service
            .issue("user@example.com", &client())
            .await
            .unwrap();

        fixture
            .service
            .redeem(&issued.token, &client())
            .await
            .unwrap();

        let result = fixture.service.redeem(&issued.token, &client()).await;
        assert!(matches!(
            result,
            Err(Error::Auth(AuthError::InvalidMagicToken))
        ));
    }

    #[tokio::test]
    async fn test_expired_token_rejected_even_if_unused() {
        let fixture = fixture();
        register_user(&fixture).await;

        // A service issuing links that are already past their expiry
        let service = MagicLinkService::new(
            fixture.users.clone(),
            fixture.links.clone(),
            fixture.attempts.clone(),
            fixture.audit.clone(),
            "https://tags.example.com",
        )
        .with_expiry(Duration::minutes(-1));

        let issued = service.issue("user@example.com", &client()).await.unwrap();

        let result = service.redeem(&issued.token, &client()).await;
        assert!(matches!(
            result,
            Err(Error::Auth(AuthError::InvalidMagicToken))
        ));

        // Still marked unused: rejection came from the expiry check
        assert!(!fixture.links.links.lock().unwrap()[&issued.token].used);
    }

    #[tokio::test]
    async fn test_unknown_token_rejected() {
        let fixture = fixture();

        let result = fixture.service.redeem("no-such-token", &client()).await;
        assert!(matches!(
            result,
            Err(Error::Auth(AuthError::InvalidMagicToken))
        ));
    }
}
