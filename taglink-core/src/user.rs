//! Core user types
//!
//! A user is created at registration and read at login. The stored record
//! carries the password hash, but the hash never travels with the public
//! profile: it is fetched separately through
//! [`UserRepository::password_hash`](crate::repositories::UserRepository::password_hash).

use crate::id::{generate_prefixed_id, validate_prefixed_id};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A unique, stable identifier for a specific user.
///
/// This value should be treated as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: &str) -> Self {
        UserId(id.to_string())
    }

    pub fn new_random() -> Self {
        UserId(generate_prefixed_id("usr"))
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Validate that this ID has the correct format for a user ID
    pub fn is_valid(&self) -> bool {
        validate_prefixed_id(&self.0, "usr")
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new_random()
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Public representation of a user.
///
/// This is the profile returned by registration, login and the user listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// The unique identifier for the user.
    pub id: UserId,

    /// The display name of the user.
    pub name: String,

    /// The email of the user. Unique across all users.
    pub email: String,

    /// The created at timestamp.
    pub created_at: DateTime<Utc>,

    /// The updated at timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A user record to be inserted at registration.
///
/// Carries the already-hashed password; plaintext passwords never reach the
/// storage layer.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

impl NewUser {
    pub fn new(name: String, email: String, password_hash: String) -> Self {
        Self {
            id: UserId::new_random(),
            name,
            email,
            password_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_id() {
        let user_id = UserId::new("test");
        assert_eq!(user_id.as_str(), "test");

        let user_id_from_str = UserId::from(user_id.as_str());
        assert_eq!(user_id_from_str, user_id);

        let user_id_random = UserId::new_random();
        assert_ne!(user_id_random, user_id);
    }

    #[test]
    fn test_user_id_prefixed() {
        let user_id = UserId::new_random();
        assert!(user_id.as_str().starts_with("usr_"));
        assert!(user_id.is_valid());

        let user_id2 = UserId::new_random();
        assert_ne!(user_id, user_id2);

        let invalid_id = UserId::new("invalid");
        assert!(!invalid_id.is_valid());
    }

    #[test]
    fn test_new_user_gets_random_id() {
        let a = NewUser::new("A".into(), "a@example.com".into(), "hash".into());
        let b = NewUser::new("B".into(), "b@example.com".into(), "hash".into());
        assert_ne!(a.id, b.id);
    }
}
