use async_trait::async_trait;

use crate::{
    Error, UserId,
    storage::{Card, CardId, CardWithOwner, NewCard},
};

/// Repository for card (tag) records
#[async_trait]
pub trait CardRepository: Send + Sync + 'static {
    /// Insert a card with the given ID
    async fn create(&self, id: CardId, card: NewCard) -> Result<Card, Error>;

    /// List cards joined with owner identity, optionally for one user only
    async fn list(&self, user_id: Option<&UserId>) -> Result<Vec<CardWithOwner>, Error>;

    /// Delete a card by ID. Returns the number of rows deleted.
    async fn delete(&self, id: &CardId) -> Result<u64, Error>;
}
