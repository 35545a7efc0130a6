//! User registration and lookup.

use std::sync::Arc;

use crate::{
    Error, User, UserId,
    crypto::hash_password,
    error::AuthError,
    repositories::UserRepository,
    user::NewUser,
    validation::{validate_email, validate_name, validate_password},
};

/// Service for user management operations
pub struct UserService<U: UserRepository> {
    repository: Arc<U>,
}

impl<U: UserRepository> UserService<U> {
    pub fn new(repository: Arc<U>) -> Self {
        Self { repository }
    }

    /// Register a new user.
    ///
    /// Validates name, email and password, hashes the password with argon2
    /// and inserts the record. A duplicate email is rejected.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User, Error> {
        validate_name(name)?;
        validate_email(email)?;
        validate_password(password)?;

        if self.repository.find_by_email(email).await?.is_some() {
            return Err(Error::Auth(AuthError::UserAlreadyExists));
        }

        let password_hash = hash_password(password);
        self.repository
            .create(NewUser::new(
                name.to_string(),
                email.to_string(),
                password_hash,
            ))
            .await
    }

    /// Get a user by ID
    pub async fn get_user(&self, id: &UserId) -> Result<Option<User>, Error> {
        self.repository.find_by_id(id).await
    }

    /// Get a user by email
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        self.repository.find_by_email(email).await
    }

    /// List all users (public profiles)
    pub async fn list(&self) -> Result<Vec<User>, Error> {
        self.repository.list().await
    }
}
