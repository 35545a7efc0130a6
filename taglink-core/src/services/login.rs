//! The login sequence.
//!
//! Four hard gates, in order: the source-address rate limit, the user lookup,
//! the password check and the optional second factor. The decision itself is
//! a pure function ([`decide`]) over pre-fetched facts and a supplied
//! timestamp; this service is the thin shell that performs the repository
//! reads, calls the decision, and records the attempt outcome.
//!
//! Every branch except "second factor required, no code yet" writes exactly
//! one login attempt row.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    Error, User, UserId,
    crypto::verify_password,
    error::AuthError,
    repositories::{LoginAttemptRepository, TwoFactorRepository, UserRepository},
    services::two_factor::verify_one_time_code,
    storage::{ClientInfo, NewLoginAttempt, RateLimitConfig, TwoFactorRecord},
};

/// Submitted login credentials.
#[derive(Debug, Clone)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
    pub one_time_code: Option<String>,
}

/// The public profile fields returned on a successful login.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// The outcome of one login call.
///
/// `NotFound` and `BadPassword` are distinct here so the attempt log can
/// attribute failures, but callers exposing this to the network must collapse
/// them into one generic rejection to avoid leaking which accounts exist.
#[derive(Debug, Clone)]
pub enum LoginOutcome {
    /// Too many recent failures from this source address
    RateLimited,
    /// No user with the submitted email
    NotFound,
    /// Password did not match the stored hash
    BadPassword,
    /// Credentials valid, but a one-time code is required and none was given
    NeedsSecondFactor(UserProfile),
    /// Credentials valid, one-time code was not
    BadSecondFactor,
    /// Authenticated
    Success {
        user: UserProfile,
        second_factor_enabled: bool,
    },
}

/// Everything the decision needs, fetched up front by the shell.
///
/// When the caller is already rate limited the user-dependent fields stay
/// `None`; [`decide`] checks the limit before touching them.
#[derive(Debug)]
pub struct LoginFacts {
    pub recent_failures: u32,
    pub user: Option<User>,
    pub password_hash: Option<String>,
    pub second_factor: Option<TwoFactorRecord>,
}

/// What the shell should do next: the pure verdict of the gate sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    RateLimited,
    NotFound,
    BadPassword,
    NeedsSecondFactor,
    BadSecondFactor,
    Success,
}

/// Run the gate sequence over pre-fetched facts.
///
/// Pure apart from the argon2/TOTP arithmetic: no I/O, the clock is an
/// argument. Gates are evaluated strictly in order; each failure short
/// circuits the rest.
pub fn decide(
    facts: &LoginFacts,
    credentials: &LoginCredentials,
    limits: &RateLimitConfig,
    now: DateTime<Utc>,
) -> Result<Decision, Error> {
    // Gate 1: the rate limit. No credential check happens past this point
    // for a blocked caller.
    if facts.recent_failures > limits.max_failures {
        return Ok(Decision::RateLimited);
    }

    // Gate 2: the user must exist.
    if facts.user.is_none() {
        return Ok(Decision::NotFound);
    }

    // Gate 3: the password must match. A user row without a stored hash
    // behaves like a mismatch.
    let hash_matches = facts
        .password_hash
        .as_deref()
        .is_some_and(|hash| verify_password(&credentials.password, hash));
    if !hash_matches {
        return Ok(Decision::BadPassword);
    }

    // Gate 4: the second factor, when enabled.
    let Some(record) = facts.second_factor.as_ref().filter(|r| r.is_enabled) else {
        return Ok(Decision::Success);
    };

    let Some(code) = credentials.one_time_code.as_deref() else {
        return Ok(Decision::NeedsSecondFactor);
    };

    if verify_one_time_code(&record.secret, code, now)? {
        Ok(Decision::Success)
    } else {
        Ok(Decision::BadSecondFactor)
    }
}

/// Service coordinating the login sequence against the repositories.
pub struct LoginService<U, A, T>
where
    U: UserRepository,
    A: LoginAttemptRepository,
    T: TwoFactorRepository,
{
    users: Arc<U>,
    attempts: Arc<A>,
    two_factor: Arc<T>,
    rate_limit: RateLimitConfig,
}

impl<U, A, T> LoginService<U, A, T>
where
    U: UserRepository,
    A: LoginAttemptRepository,
    T: TwoFactorRepository,
{
    pub fn new(
        users: Arc<U>,
        attempts: Arc<A>,
        two_factor: Arc<T>,
        rate_limit: RateLimitConfig,
    ) -> Self {
        Self {
            users,
            attempts,
            two_factor,
            rate_limit,
        }
    }

    /// Attempt a login.
    pub async fn login(
        &self,
        credentials: &LoginCredentials,
        client: &ClientInfo,
    ) -> Result<LoginOutcome, Error> {
        let now = Utc::now();
        let since = now - self.rate_limit.window;

        let recent_failures = self
            .attempts
            .count_recent_failures(&client.source_address, since)
            .await?;

        // A blocked caller gets no lookups at all.
        let (user, password_hash, second_factor) =
            if recent_failures > self.rate_limit.max_failures {
                (None, None, None)
            } else {
                match self.users.find_by_email(&credentials.email).await? {
                    None => (None, None, None),
                    Some(user) => {
                        let password_hash = self.users.password_hash(&user.id).await?;
                        let second_factor = self.two_factor.find_by_user(&user.id).await?;
                        (Some(user), password_hash, second_factor)
                    }
                }
            };

        let facts = LoginFacts {
            recent_failures,
            user,
            password_hash,
            second_factor,
        };

        let decision = decide(&facts, credentials, &self.rate_limit, now)?;

        let email = credentials.email.as_str();
        match decision {
            Decision::RateLimited => {
                self.attempts
                    .record(NewLoginAttempt::blocked(email, client))
                    .await?;
                Ok(LoginOutcome::RateLimited)
            }
            Decision::NotFound => {
                self.attempts
                    .record(NewLoginAttempt::failure(email, None, client))
                    .await?;
                Ok(LoginOutcome::NotFound)
            }
            Decision::BadPassword => {
                let user_id = facts.user.as_ref().map(|u| u.id.clone());
                self.attempts
                    .record(NewLoginAttempt::failure(email, user_id, client))
                    .await?;
                Ok(LoginOutcome::BadPassword)
            }
            Decision::NeedsSecondFactor => {
                // Neither a success nor a failure: no attempt row here.
                let user = facts.user.as_ref().ok_or(AuthError::UserNotFound)?;
                Ok(LoginOutcome::NeedsSecondFactor(UserProfile::from(user)))
            }
            Decision::BadSecondFactor => {
                let user = facts.user.as_ref().ok_or(AuthError::UserNotFound)?;
                self.attempts
                    .record(NewLoginAttempt::second_factor_failure(
                        email,
                        user.id.clone(),
                        client,
                    ))
                    .await?;
                Ok(LoginOutcome::BadSecondFactor)
            }
            Decision::Success => {
                let user = facts.user.as_ref().ok_or(AuthError::UserNotFound)?;
                self.attempts
                    .record(NewLoginAttempt::success(email, user.id.clone(), client))
                    .await?;
                let second_factor_enabled = facts
                    .second_factor
                    .as_ref()
                    .is_some_and(|r| r.is_enabled);
                Ok(LoginOutcome::Success {
                    user: UserProfile::from(user),
                    second_factor_enabled,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::hash_password;
    use crate::storage::{LoginAttempt, NewTwoFactorRecord};
    use crate::user::NewUser;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use totp_rs::{Algorithm, Secret, TOTP};

    #[derive(Default)]
    struct MockUserRepository {
        users: Mutex<Vec<User>>,
        hashes: Mutex<HashMap<UserId, String>>,
    }

    #[async_trait]
    impl UserRepository for MockUserRepository {
        async fn create(&self, new_user: NewUser) -> Result<User, Error> {
            let now = Utc::now();
            let user = User {
                id: new_user.id.clone(),
                name: new_user.name,
                email: new_user.email,
                created_at: now,
                updated_at: now,
            };
            self.hashes
                .lock()
                .unwrap()
                .insert(new_user.id, new_user.password_hash);
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

        async fn password_hash(&self, id: &UserId) -> Result<Option<String>, Error> {
            Ok(self.hashes.lock().unwrap().get(id).cloned())
        }

        async fn list(&self) -> Result<Vec<User>, Error> {
            Ok(self.users.lock().unwrap().clone())
        }
    }

    #[derive(Default)]
    struct MockAttemptRepository {
        attempts: Mutex<Vec<LoginAttempt>>,
    }

    #[async_trait]
    impl LoginAttemptRepository for MockAttemptRepository {
        async fn record(&self, attempt: NewLoginAttempt) -> Result<LoginAttempt, Error> {
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
            source_address: &str,
            since: DateTime<Utc>,
        ) -> Result<u32, Error> {
            Ok(self
                .attempts
                .lock()
                .unwrap()
                .iter()
                .filter(|a| {
                    a.source_address == source_address && !a.success && a.created_at >= since
                })
                .count() as u32)
        }
    }

    #[derive(Default)]
    struct MockTwoFactorRepository {
        records: Mutex<HashMap<UserId, TwoFactorRecord>>,
    }

    #[async_trait]
    impl TwoFactorRepository for MockTwoFactorRepository {
        async fn create(&self, record: NewTwoFactorRecord) -> Result<TwoFactorRecord, Error> {
            let now = Utc::now();
            let stored = TwoFactorRecord {
                user_id: record.user_id.clone(),
                secret: record.secret,
                is_enabled: false,
                recovery_codes: record.recovery_codes,
                created_at: now,
                updated_at: now,
            };
            self.records
                .lock()
                .unwrap()
                .insert(record.user_id, stored.clone());
            Ok(stored)
        }

        async fn find_by_user(&self, user_id: &UserId) -> Result<Option<TwoFactorRecord>, Error> {
            Ok(self.records.lock().unwrap().get(user_id).cloned())
        }

        async fn set_enabled(&self, user_id: &UserId, enabled: bool) -> Result<(), Error> {
            if let Some(record) = self.records.lock().unwrap().get_mut(user_id) {
                record.is_enabled = enabled;
            }
            Ok(())
        }

        async fn update_recovery_codes(
            &self,
            user_id: &UserId,
            codes: &[String],
        ) -> Result<(), Error> {
            if let Some(record) = self.records.lock().unwrap().get_mut(user_id) {
                record.recovery_codes = codes.to_vec();
            }
            Ok(())
        }
    }

    struct Fixture {
        users: Arc<MockUserRepository>,
        attempts: Arc<MockAttemptRepository>,
        two_factor: Arc<MockTwoFactorRepository>,
        service: LoginService<MockUserRepository, MockAttemptRepository, MockTwoFactorRepository>,
    }

    fn fixture() -> Fixture {
        let users = Arc::new(MockUserRepository::default());
        let attempts = Arc::new(MockAttemptRepository::default());
        let two_factor = Arc::new(MockTwoFactorRepository::default());
        let service = LoginService::new(
            users.clone(),
            attempts.clone(),
            two_factor.clone(),
            RateLimitConfig::default(),
        );
        Fixture {
            users,
            attempts,
            two_factor,
            service,
        }
    }

    fn client() -> ClientInfo {
        ClientInfo::new("203.0.113.9", Some("test-agent".to_string()))
    }

    fn credentials(password: &str, code: Option<&str>) -> LoginCredentials {
        LoginCredentials {
            email: "user@example.com".to_string(),
            password: password.to_string(),
            one_time_code: code.map(str::to_string),
        }
    }

    async fn register_user(fixture: &Fixture, password: &str) -> User {
        fixture
            .users
            .create(NewUser::new(
                "Test User".to_string(),
                "user@example.com".to_string(),
                hash_password(password),
            ))
            .await
            .unwrap()
    }

    async fn enable_two_factor(fixture: &Fixture, user_id: &UserId) -> String {
        let secret_bytes = Secret::generate_secret().to_bytes().unwrap();
        let totp = TOTP::new(
            Algorithm::SHA1,
            6,
            1,
            30,
            secret_bytes,
            None,
            "account".to_string(),
        )
        .unwrap();
        let secret = totp.get_secret_base32();
        fixture
            .two_factor
            .create(NewTwoFactorRecord {
                user_id: user_id.clone(),
                secret: secret.clone(),
                recovery_codes: vec![],
            })
            .await
            .unwrap();
        fixture.two_factor.set_enabled(user_id, true).await.unwrap();
        secret
    }

    fn code_for(secret_base32: &str) -> String {
        let secret_bytes = Secret::Encoded(secret_base32.to_string())
            .to_bytes()
            .unwrap();
        let totp = TOTP::new(
            Algorithm::SHA1,
            6,
            1,
            30,
            secret_bytes,
            None,
            "account".to_string(),
        )
        .unwrap();
        totp.generate(Utc::now().timestamp() as u64)
    }

    #[tokio::test]
    async fn test_success_without_second_factor() {
        let fixture = fixture();
        let user = register_user(&fixture, "hunter2hunter2").await;

        let outcome = fixture
            .service
            .login(&credentials("hunter2hunter2", None), &client())
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

        let attempts = fixture.attempts.attempts.lock().unwrap();
        assert_eq!(attempts.len(), 1);
        assert!(attempts[0].success);
        assert_eq!(attempts[0].user_id, Some(user.id));
    }

    #[tokio::test]
    async fn test_unknown_user_records_failure_without_user_id() {
        let fixture = fixture();

        let outcome = fixture
            .service
            .login(&credentials("whatever123", None), &client())
            .await
            .unwrap();

        assert!(matches!(outcome, LoginOutcome::NotFound));

        let attempts = fixture.attempts.attempts.lock().unwrap();
        assert_eq!(attempts.len(), 1);
        assert!(!attempts[0].success);
        assert_eq!(attempts[0].user_id, None);
    }

    #[tokio::test]
    async fn test_wrong_password_records_failure_with_user_id() {
        let fixture = fixture();
        let user = register_user(&fixture, "hunter2hunter2").await;

        let outcome = fixture
            .service
            .login(&credentials("wrong-password", None), &client())
            .await
            .unwrap();

        assert!(matches!(outcome, LoginOutcome::BadPassword));

        let attempts = fixture.attempts.attempts.lock().unwrap();
        assert_eq!(attempts.len(), 1);
        assert!(!attempts[0].success);
        assert_eq!(attempts[0].user_id, Some(user.id));
    }

    #[tokio::test]
    async fn test_rate_limit_blocks_seventh_attempt() {
        let fixture = fixture();
        register_user(&fixture, "hunter2hunter2").await;

        // Six failures from one source address within the window
        for _ in 0..6 {
            let outcome = fixture
                .service
                .login(&credentials("wrong-password", None), &client())
                .await
                .unwrap();
            assert!(matches!(outcome, LoginOutcome::BadPassword));
        }

        // The seventh attempt is rejected even with correct credentials
        let outcome = fixture
            .service
            .login(&credentials("hunter2hunter2", None), &client())
            .await
            .unwrap();
        assert!(matches!(outcome, LoginOutcome::RateLimited));

        let attempts = fixture.attempts.attempts.lock().unwrap();
        assert_eq!(attempts.len(), 7);
        let last = attempts.last().unwrap();
        assert!(last.blocked);
        assert!(!last.success);
    }

    #[tokio::test]
    async fn test_rate_limit_is_per_source_address() {
        let fixture = fixture();
        register_user(&fixture, "hunter2hunter2").await;

        for _ in 0..6 {
            fixture
                .service
                .login(&credentials("wrong-password", None), &client())
                .await
                .unwrap();
        }

        // A different source address is unaffected
        let other = ClientInfo::new("198.51.100.7", None);
        let outcome = fixture
            .service
            .login(&credentials("hunter2hunter2", None), &other)
            .await
            .unwrap();
        assert!(matches!(outcome, LoginOutcome::Success { .. }));
    }

    #[tokio::test]
    async fn test_second_factor_required_records_no_attempt() {
        let fixture = fixture();
        let user = register_user(&fixture, "hunter2hunter2").await;
        enable_two_factor(&fixture, &user.id).await;

        let outcome = fixture
            .service
            .login(&credentials("hunter2hunter2", None), &client())
            .await
            .unwrap();

        match outcome {
            LoginOutcome::NeedsSecondFactor(profile) => assert_eq!(profile.id, user.id),
            other => panic!("Expected NeedsSecondFactor, got {other:?}"),
        }

        assert!(fixture.attempts.attempts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_factor_success_records_one_attempt() {
        let fixture = fixture();
        let user = register_user(&fixture, "hunter2hunter2").await;
        let secret = enable_two_factor(&fixture, &user.id).await;

        let code = code_for(&secret);
        let outcome = fixture
            .service
            .login(&credentials("hunter2hunter2", Some(&code)), &client())
            .await
            .unwrap();

        match outcome {
            LoginOutcome::Success {
                second_factor_enabled,
                ..
            } => assert!(second_factor_enabled),
            other => panic!("Expected Success, got {other:?}"),
        }

        let attempts = fixture.attempts.attempts.lock().unwrap();
        assert_eq!(attempts.len(), 1);
        assert!(attempts[0].success);
    }

    #[tokio::test]
    async fn test_bad_second_factor_code() {
        let fixture = fixture();
        let user = register_user(&fixture, "hunter2hunter2").await;
        enable_two_factor(&fixture, &user.id).await;

        let outcome = fixture
            .service
            .login(&credentials("hunter2hunter2", Some("000000")), &client())
            .await
            .unwrap();

        assert!(matches!(outcome, LoginOutcome::BadSecondFactor));

        let attempts = fixture.attempts.attempts.lock().unwrap();
        assert_eq!(attempts.len(), 1);
        assert!(!attempts[0].success);
        assert!(attempts[0].twofa_failed);
    }

    #[tokio::test]
    async fn test_disabled_second_factor_is_skipped() {
        let fixture = fixture();
        let user = register_user(&fixture, "hunter2hunter2").await;
        // Enrolled but never confirmed: is_enabled stays false
        let secret_bytes = Secret::generate_secret().to_bytes().unwrap();
        let totp = TOTP::new(
            Algorithm::SHA1,
            6,
            1,
            30,
            secret_bytes,
            None,
            "account".to_string(),
        )
        .unwrap();
        fixture
            .two_factor
            .create(NewTwoFactorRecord {
                user_id: user.id.clone(),
                secret: totp.get_secret_base32(),
                recovery_codes: vec![],
            })
            .await
            .unwrap();

        let outcome = fixture
            .service
            .login(&credentials("hunter2hunter2", None), &client())
            .await
            .unwrap();

        match outcome {
            LoginOutcome::Success {
                second_factor_enabled,
                ..
            } => assert!(!second_factor_enabled),
            other => panic!("Expected Success, got {other:?}"),
        }
    }

    #[test]
    fn test_decide_gate_order() {
        let limits = RateLimitConfig::default();
        let now = Utc::now();
        let creds = credentials("irrelevant", None);

        // Rate limit wins over everything, even with no user fetched
        let facts = LoginFacts {
            recent_failures: 6,
            user: None,
            password_hash: None,
            second_factor: None,
        };
        assert_eq!(
            decide(&facts, &creds, &limits, now).unwrap(),
            Decision::RateLimited
        );

        // At the limit but not over it: falls through to the user gate
        let facts = LoginFacts {
            recent_failures: 5,
            user: None,
            password_hash: None,
            second_factor: None,
        };
        assert_eq!(
            decide(&facts, &creds, &limits, now).unwrap(),
            Decision::NotFound
        );
    }

    #[test]
    fn test_decide_missing_hash_is_bad_password() {
        let limits = RateLimitConfig::default();
        let now = Utc::now();
        let user = User {
            id: UserId::new_random(),
            name: "Test".to_string(),
            email: "user@example.com".to_string(),
            created_at: now,
            updated_at: now,
        };

        let facts = LoginFacts {
            recent_failures: 0,
            user: Some(user),
            password_hash: None,
            second_factor: None,
        };
        assert_eq!(
            decide(&facts, &credentials("anything", None), &limits, now).unwrap(),
            Decision::BadPassword
        );
    }
}
