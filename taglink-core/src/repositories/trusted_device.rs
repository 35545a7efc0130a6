use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    Error, UserId,
    storage::{NewTrustedDevice, TrustedDevice},
};

/// Repository for trusted device records
#[async_trait]
pub trait TrustedDeviceRepository: Send + Sync + 'static {
    /// Register a device
    async fn create(&self, device: NewTrustedDevice) -> Result<TrustedDevice, Error>;

    /// List a user's devices, most recently used first
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<TrustedDevice>, Error>;

    /// Refresh `last_used_at` for a matching, non-expired device.
    ///
    /// Returns the refreshed row, or `None` when no device matches or the
    /// record has expired. Implementations must perform the expiry check and
    /// the refresh as a single conditional update.
    async fn touch(
        &self,
        user_id: &UserId,
        device_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<TrustedDevice>, Error>;

    /// Remove a device. Returns the number of rows deleted.
    async fn remove(&self, user_id: &UserId, device_id: &str) -> Result<u64, Error>;
}
