//! In-process entity store.

use super::store::{EntityStore, StoreError, WriteBatch};
use crate::domain::{
    Account, Address, EventId, HistoricalRecord, Market, Position, PositionId,
    PositionTransaction, PositionTransactionId, ProtocolConfig, RecordKind,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    markets: HashMap<Address, Market>,
    accounts: HashMap<Address, Account>,
    positions: HashMap<PositionId, Position>,
    position_transactions: HashMap<PositionTransactionId, PositionTransaction>,
    protocol_config: Option<ProtocolConfig>,
    /// Insertion order, for inspection.
    records: Vec<HistoricalRecord>,
    record_index: HashMap<EventId, usize>,
}

/// Entity store kept in maps behind a mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// All records in insertion order.
    pub fn records(&self) -> Vec<HistoricalRecord> {
        self.state().records.clone()
    }

    pub fn records_of_kind(&self, kind: RecordKind) -> Vec<HistoricalRecord> {
        self.state()
            .records
            .iter()
            .filter(|r| r.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn position_transactions(&self) -> Vec<PositionTransaction> {
        let mut txs: Vec<_> = self.state().position_transactions.values().cloned().collect();
        txs.sort_by(|a, b| a.id.cmp(&b.id));
        txs
    }

    pub fn market_count(&self) -> usize {
        self.state().markets.len()
    }

    pub fn account_count(&self) -> usize {
        self.state().accounts.len()
    }

    pub fn position_count(&self) -> usize {
        self.state().positions.len()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn load_market(&self, id: &Address) -> Result<Option<Market>, StoreError> {
        Ok(self.state().markets.get(id).cloned())
    }

    async fn load_account(&self, id: &Address) -> Result<Option<Account>, StoreError> {
        Ok(self.state().accounts.get(id).cloned())
    }

    async fn load_position(&self, id: &PositionId) -> Result<Option<Position>, StoreError> {
        Ok(self.state().positions.get(id).cloned())
    }

    async fn load_position_transaction(
        &self,
        id: &PositionTransactionId,
    ) -> Result<Option<PositionTransaction>, StoreError> {
        Ok(self.state().position_transactions.get(id).cloned())
    }

    async fn load_protocol_config(&self) -> Result<Option<ProtocolConfig>, StoreError> {
        Ok(self.state().protocol_config.clone())
    }

    async fn load_record(&self, id: &EventId) -> Result<Option<HistoricalRecord>, StoreError> {
        let state = self.state();
        Ok(state
            .record_index
            .get(id)
            .and_then(|i| state.records.get(*i))
            .cloned())
    }

    /// The whole batch is applied under one lock.
    async fn commit(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        let mut state = self.state();
        for (id, market) in &batch.markets {
            state.markets.insert(id.clone(), market.clone());
        }
        for (id, account) in &batch.accounts {
            state.accounts.insert(id.clone(), account.clone());
        }
        for (id, position) in &batch.positions {
            state.positions.insert(id.clone(), position.clone());
        }
        for (id, transaction) in &batch.position_transactions {
            state
                .position_transactions
                .entry(id.clone())
                .or_insert_with(|| transaction.clone());
        }
        if let Some(config) = &batch.protocol_config {
            state.protocol_config = Some(config.clone());
        }
        for record in &batch.records {
            if state.record_index.contains_key(&record.id) {
                continue;
            }
            let index = state.records.len();
            state.records.push(record.clone());
            state.record_index.insert(record.id.clone(), index);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, RecordBody, TxHash};

    fn hash() -> TxHash {
        TxHash::parse(&format!("0x{}", "c".repeat(64))).unwrap()
    }

    fn transfer(amount: &str) -> HistoricalRecord {
        HistoricalRecord {
            id: EventId::new(hash(), 0),
            market: Address::zero(),
            block_number: 1,
            block_time: 1,
            body: RecordBody::Transfer {
                amount: Decimal::from_str_canonical(amount).unwrap(),
                from: Address::zero(),
                to: Address::zero(),
                market_symbol: "cDAI".to_string(),
            },
        }
    }

    fn batch_with_record(amount: &str) -> WriteBatch {
        let mut batch = WriteBatch::new();
        batch.records.push(transfer(amount));
        batch
    }

    #[tokio::test]
    async fn test_commit_duplicate_record_keeps_first() {
        let store = MemoryStore::new();
        store.commit(&batch_with_record("1")).await.unwrap();
        store.commit(&batch_with_record("2")).await.unwrap();

        let stored = store
            .load_record(&EventId::new(hash(), 0))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, transfer("1"));
        assert_eq!(store.records().len(), 1);
    }

    #[tokio::test]
    async fn test_commit_overwrites_market() {
        let store = MemoryStore::new();
        let mut market = Market::new(Address::zero());
        let mut batch = WriteBatch::new();
        batch.markets.insert(market.id.clone(), market.clone());
        store.commit(&batch).await.unwrap();

        market.symbol = "cETH".to_string();
        batch.markets.insert(market.id.clone(), market.clone());
        store.commit(&batch).await.unwrap();

        let loaded = store.load_market(&Address::zero()).await.unwrap().unwrap();
        assert_eq!(loaded.symbol, "cETH");
        assert_eq!(store.market_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_commit_changes_nothing() {
        let store = MemoryStore::new();
        assert!(WriteBatch::new().is_empty());
        store.commit(&WriteBatch::new()).await.unwrap();
        assert_eq!(store.market_count(), 0);
        assert!(store.records().is_empty());
        assert!(store.load_protocol_config().await.unwrap().is_none());
    }
}
