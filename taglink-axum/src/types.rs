use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use taglink::{AuditLogEntry, CardWithOwner, TrustedDevice, UserProfile};

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(rename = "otpToken")]
    pub otp_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginSuccessResponse {
    pub success: bool,
    pub user: UserProfile,
    #[serde(rename = "twoFactorEnabled")]
    pub two_factor_enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SecondFactorRequiredResponse {
    #[serde(rename = "requires2FA")]
    pub requires_2fa: bool,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCardRequest {
    pub uid: String,
    pub link: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteCardRequest {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CardsQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardOwner {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CardResponse {
    pub id: String,
    pub uid: String,
    pub link: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<CardOwner>,
}

impl From<CardWithOwner> for CardResponse {
    fn from(listing: CardWithOwner) -> Self {
        Self {
            id: listing.card.id.to_string(),
            uid: listing.card.uid,
            link: listing.card.link,
            user_id: listing.card.user_id.to_string(),
            created_at: listing.card.created_at,
            owner: Some(CardOwner {
                name: listing.owner_name,
                email: listing.owner_email,
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwoFactorSetupRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TwoFactorSetupResponse {
    pub success: bool,
    #[serde(rename = "qrCode")]
    pub qr_code: String,
    #[serde(rename = "recoveryCodes")]
    pub recovery_codes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwoFactorVerifyRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecoveryCodeRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "recoveryCode")]
    pub recovery_code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MagicLinkRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MagicLinkResponse {
    pub success: bool,
    #[serde(rename = "magicLink", skip_serializing_if = "Option::is_none")]
    pub magic_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MagicLinkVerifyQuery {
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MagicLinkUserResponse {
    pub success: bool,
    pub user: UserProfile,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterDeviceRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "deviceName")]
    pub device_name: Option<String>,
    #[serde(rename = "rememberDays")]
    pub remember_days: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterDeviceResponse {
    pub success: bool,
    #[serde(rename = "deviceId")]
    pub device_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeviceListQuery {
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceListResponse {
    pub devices: Vec<TrustedDevice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateDeviceRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "deviceId")]
    pub device_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidResponse {
    pub valid: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteDeviceQuery {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "deviceId")]
    pub device_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuditLogsQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
    pub action: Option<String>,
    pub entity: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(rename = "endDate")]
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditLogsResponse {
    pub logs: Vec<AuditLogEntry>,
    pub total: u64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordAuditRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub action: String,
    pub entity: String,
    #[serde(rename = "entityId")]
    pub entity_id: Option<String>,
    pub details: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
