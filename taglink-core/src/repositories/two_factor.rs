use async_trait::async_trait;

use crate::{
    Error, UserId,
    storage::{NewTwoFactorRecord, TwoFactorRecord},
};

/// Repository for second-factor records
#[async_trait]
pub trait TwoFactorRepository: Send + Sync + 'static {
    /// Store a new record at enrollment, with `is_enabled = false`.
    async fn create(&self, record: NewTwoFactorRecord) -> Result<TwoFactorRecord, Error>;

    /// Fetch the record for a user, if enrolled
    async fn find_by_user(&self, user_id: &UserId) -> Result<Option<TwoFactorRecord>, Error>;

    /// Flip the enabled flag
    async fn set_enabled(&self, user_id: &UserId, enabled: bool) -> Result<(), Error>;

    /// Replace the stored recovery codes.
    ///
    /// Consumed codes are removed by match, not tombstoned, so the list only
    /// ever shrinks.
    async fn update_recovery_codes(&self, user_id: &UserId, codes: &[String])
    -> Result<(), Error>;
}
