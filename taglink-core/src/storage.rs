//! Record types shared between services and storage backends
//!
//! Everything persisted by a repository is described here: login attempts,
//! second-factor records, magic links, trusted devices, cards and audit log
//! entries, plus the small query/config structs that travel with them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;
use crate::id::generate_prefixed_id;

/// Connection details of the caller, extracted at the HTTP boundary.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub source_address: String,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn new(source_address: impl Into<String>, user_agent: Option<String>) -> Self {
        Self {
            source_address: source_address.into(),
            user_agent,
        }
    }
}

/// Configuration for the login rate limiter.
///
/// Failed attempts from one source address are counted over a trailing
/// window; once the count exceeds `max_failures` further attempts are
/// rejected without a credential check.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_failures: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::minutes(10),
            max_failures: 5,
        }
    }
}

/// An append-only record of a login attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginAttempt {
    pub id: i64,
    pub email: String,
    pub source_address: String,
    pub user_id: Option<UserId>,
    pub user_agent: Option<String>,
    pub success: bool,
    pub blocked: bool,
    pub twofa_failed: bool,
    pub created_at: DateTime<Utc>,
}

/// A login attempt to be recorded.
#[derive(Debug, Clone)]
pub struct NewLoginAttempt {
    pub email: String,
    pub source_address: String,
    pub user_id: Option<UserId>,
    pub user_agent: Option<String>,
    pub success: bool,
    pub blocked: bool,
    pub twofa_failed: bool,
}

impl NewLoginAttempt {
    pub fn success(email: &str, user_id: UserId, client: &ClientInfo) -> Self {
        Self {
            email: email.to_string(),
            source_address: client.source_address.clone(),
            user_id: Some(user_id),
            user_agent: client.user_agent.clone(),
            success: true,
            blocked: false,
            twofa_failed: false,
        }
    }

    pub fn failure(email: &str, user_id: Option<UserId>, client: &ClientInfo) -> Self {
        Self {
            email: email.to_string(),
            source_address: client.source_address.clone(),
            user_id,
            user_agent: client.user_agent.clone(),
            success: false,
            blocked: false,
            twofa_failed: false,
        }
    }

    pub fn blocked(email: &str, client: &ClientInfo) -> Self {
        Self {
            blocked: true,
            ..Self::failure(email, None, client)
        }
    }

    pub fn second_factor_failure(email: &str, user_id: UserId, client: &ClientInfo) -> Self {
        Self {
            twofa_failed: true,
            ..Self::failure(email, Some(user_id), client)
        }
    }
}

/// Second-factor state for a user.
///
/// Created at enrollment with `is_enabled = false`; the flag flips to true on
/// the first successful verification. Recovery codes shrink as they are
/// consumed.
#[derive(Debug, Clone)]
pub struct TwoFactorRecord {
    pub user_id: UserId,
    pub secret: String,
    pub is_enabled: bool,
    pub recovery_codes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A second-factor record to be stored at enrollment.
#[derive(Debug, Clone)]
pub struct NewTwoFactorRecord {
    pub user_id: UserId,
    pub secret: String,
    pub recovery_codes: Vec<String>,
}

/// A single-use, time-limited login token.
#[derive(Debug, Clone)]
pub struct MagicLink {
    pub id: i64,
    pub user_id: UserId,
    pub token: String,
    pub used: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A magic link to be stored at issuance.
#[derive(Debug, Clone)]
pub struct NewMagicLink {
    pub user_id: UserId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// A client remembered for a limited period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustedDevice {
    pub id: i64,
    pub user_id: UserId,
    pub device_id: String,
    pub device_name: String,
    pub source_address: String,
    pub expires_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A trusted device to be registered.
#[derive(Debug, Clone)]
pub struct NewTrustedDevice {
    pub user_id: UserId,
    pub device_id: String,
    pub device_name: String,
    pub source_address: String,
    pub expires_at: DateTime<Utc>,
}

/// A unique, stable identifier for a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct CardId(String);

impl CardId {
    pub fn new(id: &str) -> Self {
        CardId(id.to_string())
    }

    pub fn new_random() -> Self {
        CardId(generate_prefixed_id("card"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for CardId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An NFC tag registered by a user: the tag uid paired with the link it
/// resolves to.
///
/// The uid is expected to be unique per physical tag but no uniqueness
/// constraint is enforced at this layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub uid: String,
    pub link: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

/// A card to be written.
#[derive(Debug, Clone)]
pub struct NewCard {
    pub uid: String,
    pub link: String,
    pub user_id: UserId,
}

/// A card joined with its owner's public identity, as returned by listings.
#[derive(Debug, Clone)]
pub struct CardWithOwner {
    pub card: Card,
    pub owner_name: String,
    pub owner_email: String,
}

/// An append-only observability record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub user_id: UserId,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub source_address: String,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An audit log entry to be appended.
#[derive(Debug, Clone)]
pub struct NewAuditLogEntry {
    pub user_id: UserId,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub source_address: String,
    pub user_agent: Option<String>,
}

impl NewAuditLogEntry {
    pub fn new(user_id: UserId, action: &str, entity: &str, client: &ClientInfo) -> Self {
        Self {
            user_id,
            action: action.to_string(),
            entity: entity.to_string(),
            entity_id: None,
            details: None,
            source_address: client.source_address.clone(),
            user_agent: client.user_agent.clone(),
        }
    }

    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Filters and pagination for querying the audit trail.
#[derive(Debug, Clone, Default)]
pub struct AuditLogQuery {
    pub user_id: Option<UserId>,
    pub action: Option<String>,
    pub entity: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl AuditLogQuery {
    pub const DEFAULT_LIMIT: i64 = 50;

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0)
    }
}

/// One page of audit log entries, newest first.
#[derive(Debug, Clone)]
pub struct AuditLogPage {
    pub entries: Vec<AuditLogEntry>,
    pub total: u64,
    pub limit: i64,
    pub offset: i64,
}
