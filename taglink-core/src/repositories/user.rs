use crate::{
    Error, User, UserId,
    user::NewUser,
};
use async_trait::async_trait;

/// Repository for user data access
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Insert a new user record. Fails on duplicate email.
    async fn create(&self, user: NewUser) -> Result<User, Error>;

    /// Find a user by ID
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, Error>;

    /// Find a user by email (exact match against the stored value)
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error>;

    /// Fetch the stored password hash for a user.
    ///
    /// Kept separate from the profile so the hash never travels with it.
    async fn password_hash(&self, id: &UserId) -> Result<Option<String>, Error>;

    /// List all users (public profiles)
    async fn list(&self) -> Result<Vec<User>, Error>;
}
