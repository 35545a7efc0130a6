//! Repository trait for the login attempt log.
//!
//! The attempt log is append-only: rows are never mutated or deleted. The
//! rate limiter is a count of recent failed rows per source address, so no
//! lockout state is stored anywhere else.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error,
    storage::{LoginAttempt, NewLoginAttempt},
};

/// Repository for login attempt records.
///
/// Failed attempts are recorded for all email addresses, even non-existent
/// ones, so the log does not reveal which accounts exist.
#[async_trait]
pub trait LoginAttemptRepository: Send + Sync + 'static {
    /// Append an attempt outcome.
    ///
    /// Returns the created record with its assigned ID and timestamp.
    async fn record(&self, attempt: NewLoginAttempt) -> Result<LoginAttempt, Error>;

    /// Count failed attempts from a source address since the given cutoff.
    ///
    /// Blocked rows count as failures: a caller that keeps hammering a
    /// rate-limited endpoint keeps extending its own window.
    async fn count_recent_failures(
        &self,
        source_address: &str,
        since: DateTime<Utc>,
    ) -> Result<u32, Error>;
}
