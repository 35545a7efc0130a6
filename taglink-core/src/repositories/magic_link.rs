use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error,
    storage::{MagicLink, NewMagicLink},
};

/// Repository for magic link tokens
#[async_trait]
pub trait MagicLinkRepository: Send + Sync + 'static {
    /// Store a freshly issued token with `used = false`.
    async fn create(&self, link: NewMagicLink) -> Result<MagicLink, Error>;

    /// Atomically consume a token.
    ///
    /// Marks the token used and returns the row only if it was still unused
    /// and unexpired at `now`. Implementations must perform this as a single
    /// conditional update so that two concurrent redemptions of the same
    /// token cannot both succeed.
    async fn consume(&self, token: &str, now: DateTime<Utc>) -> Result<Option<MagicLink>, Error>;
}
