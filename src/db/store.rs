//! Entity persistence interface.

use crate::domain::{
    Account, Address, EventId, HistoricalRecord, Market, Position, PositionId,
    PositionTransaction, PositionTransactionId, ProtocolConfig,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

/// Persistence failures. These are fatal for event processing.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{field} out of range for storage: {value}")]
    OutOfRange { field: &'static str, value: u64 },
}

/// Every write produced by one event, committed together.
///
/// Mutable kinds hold the latest copy per id. Position transactions and
/// records only ever hold entries that were absent from the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    pub markets: BTreeMap<Address, Market>,
    pub accounts: BTreeMap<Address, Account>,
    pub positions: BTreeMap<PositionId, Position>,
    pub position_transactions: BTreeMap<PositionTransactionId, PositionTransaction>,
    pub protocol_config: Option<ProtocolConfig>,
    /// In insertion order.
    pub records: Vec<HistoricalRecord>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.markets.is_empty()
            && self.accounts.is_empty()
            && self.positions.is_empty()
            && self.position_transactions.is_empty()
            && self.protocol_config.is_none()
            && self.records.is_empty()
    }

    pub fn has_record(&self, id: &EventId) -> bool {
        self.records.iter().any(|r| &r.id == id)
    }
}

/// Storage for the five entity kinds plus historical records.
///
/// Writes only happen through [`EntityStore::commit`], which applies a whole
/// batch or none of it. Position transactions and records in a batch are
/// insert-if-absent: an entry whose key is already stored is left untouched.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn load_market(&self, id: &Address) -> Result<Option<Market>, StoreError>;
    async fn load_account(&self, id: &Address) -> Result<Option<Account>, StoreError>;
    async fn load_position(&self, id: &PositionId) -> Result<Option<Position>, StoreError>;
    async fn load_position_transaction(
        &self,
        id: &PositionTransactionId,
    ) -> Result<Option<PositionTransaction>, StoreError>;
    async fn load_protocol_config(&self) -> Result<Option<ProtocolConfig>, StoreError>;
    async fn load_record(&self, id: &EventId) -> Result<Option<HistoricalRecord>, StoreError>;

    /// Apply every write in `batch` atomically.
    async fn commit(&self, batch: &WriteBatch) -> Result<(), StoreError>;
}
