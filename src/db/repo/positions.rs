//! Position and position-transaction operations for the repository.

use crate::db::store::StoreError;
use crate::domain::{Position, PositionId, PositionTransaction, PositionTransactionId};
use std::future::Future;

use super::Repository;

impl Repository {
    pub async fn position(&self, id: &PositionId) -> Result<Option<Position>, StoreError> {
        let buffered = self.pending().positions.get(id).cloned();
        match buffered {
            Some(position) => Ok(Some(position)),
            None => self.store.load_position(id).await,
        }
    }

    /// Load a position, or a zeroed one carrying `symbol` if none is stored.
    pub async fn load_or_create_position(
        &self,
        id: &PositionId,
        symbol: &str,
    ) -> Result<Position, StoreError> {
        Ok(self
            .position(id)
            .await?
            .unwrap_or_else(|| Position::new(id.clone(), symbol.to_string())))
    }

    pub fn save_position(&self, position: &Position) {
        self.pending()
            .positions
            .insert(position.id.clone(), position.clone());
    }

    pub async fn position_transaction(
        &self,
        id: &PositionTransactionId,
    ) -> Result<Option<PositionTransaction>, StoreError> {
        let buffered = self.pending().position_transactions.get(id).cloned();
        match buffered {
            Some(transaction) => Ok(Some(transaction)),
            None => self.store.load_position_transaction(id).await,
        }
    }

    /// Return the existing snapshot for `id`, or build and queue a new one.
    ///
    /// `build` only runs when no snapshot exists, so its reads happen at most
    /// once per key.
    pub async fn get_or_create_position_transaction<F, Fut>(
        &self,
        id: &PositionTransactionId,
        build: F,
    ) -> Result<PositionTransaction, StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = PositionTransaction>,
    {
        if let Some(existing) = self.position_transaction(id).await? {
            return Ok(existing);
        }
        let transaction = build().await;
        self.queue_position_transaction(&transaction);
        Ok(transaction)
    }

    /// Queue a snapshot unless one with the same id exists.
    ///
    /// # Errors
    /// Returns an error if the existence check fails.
    pub async fn insert_position_transaction(
        &self,
        transaction: &PositionTransaction,
    ) -> Result<bool, StoreError> {
        if self.position_transaction(&transaction.id).await?.is_some() {
            return Ok(false);
        }
        self.queue_position_transaction(transaction);
        Ok(true)
    }

    fn queue_position_transaction(&self, transaction: &PositionTransaction) {
        self.pending()
            .position_transactions
            .insert(transaction.id.clone(), transaction.clone());
    }
}
