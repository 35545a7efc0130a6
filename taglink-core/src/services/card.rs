//! Card management: associating a URL with a scanned tag uid.

use std::sync::Arc;

use crate::{
    Error,
    UserId,
    error::ValidationError,
    repositories::CardRepository,
    storage::{Card, CardId, CardWithOwner, NewCard},
    validation::validate_link,
};

/// Service for card operations
pub struct CardService<C: CardRepository> {
    repository: Arc<C>,
}

impl<C: CardRepository> CardService<C> {
    pub fn new(repository: Arc<C>) -> Self {
        Self { repository }
    }

    /// Write a card: store the uid/link pair for a user.
    pub async fn create(&self, card: NewCard) -> Result<Card, Error> {
        if card.uid.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "Tag uid is required".to_string(),
            )));
        }
        validate_link(&card.link)?;

        self.repository.create(CardId::new_random(), card).await
    }

    /// List cards with owner identity, optionally for one user only.
    pub async fn list(&self, user_id: Option<&UserId>) -> Result<Vec<CardWithOwner>, Error> {
        self.repository.list(user_id).await
    }

    /// Remove a card by ID.
    pub async fn delete(&self, id: &CardId) -> Result<(), Error> {
        self.repository.delete(id).await?;
        Ok(())
    }
}
