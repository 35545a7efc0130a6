//! Cryptographic utilities for tokens, passwords and recovery codes
//!
//! Magic-link tokens are 256-bit random values; recovery codes are short
//! single-use credentials compared in constant time to avoid leaking the
//! position of a match through timing.

use rand::{TryRngCore, rngs::OsRng};
use subtle::ConstantTimeEq;

/// Alphabet used for recovery codes: uppercase letters and digits.
const RECOVERY_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Number of recovery codes minted per enrollment.
pub const RECOVERY_CODE_COUNT: usize = 10;

/// Generate a cryptographically secure random token.
///
/// Produces a 256-bit (32-byte) random token encoded as URL-safe base64,
/// suitable for magic-link tokens.
///
/// # Panics
///
/// Panics if the OS random number generator fails. This indicates a critical
/// system failure from which recovery is not possible for security-sensitive
/// operations.
pub fn generate_secure_token() -> String {
    let mut bytes = [0u8; 32]; // 256 bits of entropy
    OsRng
        .try_fill_bytes(&mut bytes)
        .expect("OS RNG failure - system entropy source unavailable");
    base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, bytes)
}

/// Generate a single recovery code in `XXXXX-XXXXX` form.
///
/// Ten characters from the uppercase-alphanumeric alphabet, split into two
/// five-character blocks.
pub fn generate_recovery_code() -> String {
    let mut bytes = [0u8; 10];
    OsRng
        .try_fill_bytes(&mut bytes)
        .expect("OS RNG failure - system entropy source unavailable");

    let code: String = bytes
        .iter()
        .map(|b| RECOVERY_CODE_ALPHABET[*b as usize % RECOVERY_CODE_ALPHABET.len()] as char)
        .collect();

    format!("{}-{}", &code[..5], &code[5..])
}

/// Generate a batch of recovery codes.
pub fn generate_recovery_codes(count: usize) -> Vec<String> {
    (0..count).map(|_| generate_recovery_code()).collect()
}

/// Perform constant-time comparison of two byte slices.
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

/// Hash a password for storage using argon2.
pub fn hash_password(password: &str) -> String {
    password_auth::generate_hash(password)
}

/// Verify a password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    password_auth::verify_password(password, hash).is_ok()
}
