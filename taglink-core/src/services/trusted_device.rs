//! Trusted device registration and validation.
//!
//! A remembered device skips repeated second-factor challenges for a limited
//! period. Validation refreshes `last_used_at` through a single conditional
//! update, so an expired record can never be revived by the refresh itself.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::{
    Error, UserId,
    repositories::{AuditLogRepository, TrustedDeviceRepository},
    storage::{ClientInfo, NewAuditLogEntry, NewTrustedDevice, TrustedDevice},
};

/// Default remember period, in days.
const DEFAULT_REMEMBER_DAYS: i64 = 30;

/// Service for trusted device operations
pub struct TrustedDeviceService<D, A>
where
    D: TrustedDeviceRepository,
    A: AuditLogRepository,
{
    devices: Arc<D>,
    audit: Arc<A>,
}

impl<D, A> TrustedDeviceService<D, A>
where
    D: TrustedDeviceRepository,
    A: AuditLogRepository,
{
    pub fn new(devices: Arc<D>, audit: Arc<A>) -> Self {
        Self { devices, audit }
    }

    /// Register the calling client as a trusted device.
    ///
    /// Mints a random device identifier and stores it with the requested
    /// remember period (default 30 days). There is no cap on the number of
    /// devices per user.
    pub async fn register(
        &self,
        user_id: &UserId,
        device_name: Option<String>,
        remember_days: Option<i64>,
        client: &ClientInfo,
    ) -> Result<TrustedDevice, Error> {
        let device_id = Uuid::new_v4().to_string();
        let remember_days = remember_days.unwrap_or(DEFAULT_REMEMBER_DAYS);
        let expires_at = Utc::now() + Duration::days(remember_days);

        let device_name = device_name
            .or_else(|| client.user_agent.clone())
            .unwrap_or_else(|| "unknown".to_string());

        let device = self
            .devices
            .create(NewTrustedDevice {
                user_id: user_id.clone(),
                device_id: device_id.clone(),
                device_name: device_name.clone(),
                source_address: client.source_address.clone(),
                expires_at,
            })
            .await?;

        if let Err(e) = self
            .audit
            .record(
                NewAuditLogEntry::new(user_id.clone(), "add_trusted_device", "trusted_devices", client)
                    .with_details(json!({
                        "device_name": device_name,
                        "device_id": device_id,
                    })),
            )
            .await
        {
            tracing::warn!(error = %e, "Failed to write audit log entry");
        }

        Ok(device)
    }

    /// List a user's devices, most recently used first.
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<TrustedDevice>, Error> {
        self.devices.list_for_user(user_id).await
    }

    /// Check whether a device is still trusted.
    ///
    /// Accepts only a matching, non-expired record and refreshes its
    /// `last_used_at` in the same conditional update.
    pub async fn validate(&self, user_id: &UserId, device_id: &str) -> Result<bool, Error> {
        let refreshed = self.devices.touch(user_id, device_id, Utc::now()).await?;
        Ok(refreshed.is_some())
    }

    /// Forget a device.
    pub async fn remove(
        &self,
        user_id: &UserId,
        device_id: &str,
        client: &ClientInfo,
    ) -> Result<(), Error> {
        self.devices.remove(user_id, device_id).await?;

        if let Err(e) = self
            .audit
            .record(
                NewAuditLogEntry::new(
                    user_id.clone(),
                    "remove_trusted_device",
                    "trusted_devices",
                    client,
                )
                .with_entity_id(device_id),
            )
            .await
        {
            tracing::warn!(error = %e, "Failed to write audit log entry");
        }

        Ok(())
    }
}
