//! Second-factor enrollment and verification.
//!
//! Enrollment mints a TOTP secret and a batch of single-use recovery codes
//! and stores them disabled; a separate confirmation step flips the record to
//! enabled once the user proves they can produce a valid code. Recovery codes
//! are redeemed by exact match and removed from the stored list permanently.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use totp_rs::{Algorithm, Secret, TOTP};

use crate::{
    Error, UserId,
    crypto::{self, constant_time_compare},
    error::AuthError,
    repositories::TwoFactorRepository,
    storage::NewTwoFactorRecord,
};

/// TOTP parameters: SHA1, 6 digits, 30-second step, one step of skew
/// tolerance in either direction.
const TOTP_DIGITS: usize = 6;
const TOTP_SKEW: u8 = 1;
const TOTP_STEP: u64 = 30;

/// Everything the user needs to finish setting up their second factor.
#[derive(Debug, Clone)]
pub struct Enrollment {
    /// The shared secret, base32 encoded
    pub secret: String,
    /// The otpauth provisioning URI embedding issuer, account and secret
    pub otpauth_url: String,
    /// The provisioning URI rendered as a scannable PNG, as a data URL
    pub qr_code: String,
    /// Single-use recovery codes, shown exactly once
    pub recovery_codes: Vec<String>,
}

/// Service for second-factor operations
pub struct TwoFactorService<T: TwoFactorRepository> {
    repository: Arc<T>,
    issuer: String,
}

impl<T: TwoFactorRepository> TwoFactorService<T> {
    pub fn new(repository: Arc<T>, issuer: impl Into<String>) -> Self {
        Self {
            repository,
            issuer: issuer.into(),
        }
    }

    /// Begin enrollment: generate a secret and recovery codes, store them
    /// with `is_enabled = false`, and return the provisioning material.
    pub async fn enroll(&self, user_id: &UserId, email: &str) -> Result<Enrollment, Error> {
        let secret = Secret::generate_secret();
        let secret_bytes = secret
            .to_bytes()
            .map_err(|e| AuthError::SecondFactor(format!("Secret generation failed: {e:?}")))?;

        let totp = TOTP::new(
            Algorithm::SHA1,
            TOTP_DIGITS,
            TOTP_SKEW,
            TOTP_STEP,
            secret_bytes,
            Some(self.issuer.clone()),
            email.to_string(),
        )
        .map_err(|e| AuthError::SecondFactor(format!("TOTP init failed: {e}")))?;

        let qr = totp
            .get_qr_base64()
            .map_err(|e| AuthError::SecondFactor(format!("QR generation failed: {e}")))?;
        let qr_code = format!("data:image/png;base64,{qr}");

        let recovery_codes = crypto::generate_recovery_codes(crypto::RECOVERY_CODE_COUNT);
        let secret_base32 = totp.get_secret_base32();

        self.repository
            .create(NewTwoFactorRecord {
                user_id: user_id.clone(),
                secret: secret_base32.clone(),
                recovery_codes: recovery_codes.clone(),
            })
            .await?;

        Ok(Enrollment {
            secret: secret_base32,
            otpauth_url: totp.get_url(),
            qr_code,
            recovery_codes,
        })
    }

    /// Confirm enrollment by verifying the first code; flips the record to
    /// enabled on success.
    pub async fn confirm(&self, user_id: &UserId, code: &str) -> Result<(), Error> {
        let record = self
            .repository
            .find_by_user(user_id)
            .await?
            .ok_or(AuthError::SecondFactorNotFound)?;

        if !verify_one_time_code(&record.secret, code, Utc::now())? {
            return Err(Error::Auth(AuthError::InvalidOneTimeCode));
        }

        self.repository.set_enabled(user_id, true).await
    }

    /// Redeem a single-use recovery code.
    ///
    /// A matching code is removed from the stored list, so a second
    /// redemption of the same code is rejected.
    pub async fn redeem_recovery_code(&self, user_id: &UserId, code: &str) -> Result<(), Error> {
        let record = self
            .repository
            .find_by_user(user_id)
            .await?
            .ok_or(AuthError::SecondFactorNotFound)?;

        let position = record
            .recovery_codes
            .iter()
            .position(|stored| constant_time_compare(stored.as_bytes(), code.as_bytes()));

        let Some(position) = position else {
            return Err(Error::Auth(AuthError::InvalidRecoveryCode));
        };

        let mut codes = record.recovery_codes;
        codes.remove(position);

        self.repository.update_recovery_codes(user_id, &codes).await
    }
}

/// Verify a one-time code against a stored base32 secret at the given time.
///
/// Pure given its inputs, so login decisions stay testable with a fixed
/// clock.
pub fn verify_one_time_code(
    secret_base32: &str,
    code: &str,
    at: DateTime<Utc>,
) -> Result<bool, Error> {
    let secret_bytes = Secret::Encoded(secret_base32.to_string())
        .to_bytes()
        .map_err(|e| AuthError::SecondFactor(format!("Invalid stored secret: {e:?}")))?;

    let totp = TOTP::new(
        Algorithm::SHA1,
        TOTP_DIGITS,
        TOTP_SKEW,
        TOTP_STEP,
        secret_bytes,
        None,
        "account".to_string(),
    )
    .map_err(|e| AuthError::SecondFactor(format!("TOTP init failed: {e}")))?;

    Ok(totp.check(code, at.timestamp().max(0) as u64))
}
