//! Repository layer over an [`EntityStore`].
//!
//! Methods are organized across submodules by entity:
//! - `positions.rs` - Position and position-transaction operations
//!
//! Saves are buffered into a pending [`WriteBatch`] that reads see first.
//! [`Repository::commit`] hands the batch to the store in one call, so an
//! event is persisted completely or not at all.

mod positions;

use super::store::{EntityStore, StoreError, WriteBatch};
use crate::domain::{Account, Address, HistoricalRecord, Market, ProtocolConfig};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// Repository for entity operations.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn EntityStore>,
    pending: Arc<Mutex<WriteBatch>>,
}

impl Repository {
    /// Create a new repository over the given store.
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Repository {
            store,
            pending: Arc::new(Mutex::new(WriteBatch::new())),
        }
    }

    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    fn pending(&self) -> MutexGuard<'_, WriteBatch> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // =========================================================================
    // Unit of work
    // =========================================================================

    /// Persist every buffered write atomically and clear the buffer.
    ///
    /// The buffer is cleared even when the store fails.
    ///
    /// # Errors
    /// Returns an error if the store rejects the batch; nothing from it is kept.
    pub async fn commit(&self) -> Result<(), StoreError> {
        let batch = std::mem::take(&mut *self.pending());
        if batch.is_empty() {
            return Ok(());
        }
        self.store.commit(&batch).await
    }

    /// Drop every buffered write.
    pub fn discard(&self) {
        let dropped = std::mem::take(&mut *self.pending());
        if !dropped.is_empty() {
            debug!(
                markets = dropped.markets.len(),
                positions = dropped.positions.len(),
                records = dropped.records.len(),
                "Discarded pending writes"
            );
        }
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.pending().is_empty()
    }

    // =========================================================================
    // Market operations
    // =========================================================================

    /// Look up a market. Markets are only created by listing.
    pub async fn market(&self, id: &Address) -> Result<Option<Market>, StoreError> {
        let buffered = self.pending().markets.get(id).cloned();
        match buffered {
            Some(market) => Ok(Some(market)),
            None => self.store.load_market(id).await,
        }
    }

    pub fn save_market(&self, market: &Market) {
        self.pending()
            .markets
            .insert(market.id.clone(), market.clone());
    }

    // =========================================================================
    // Account operations
    // =========================================================================

    pub async fn load_or_create_account(&self, id: &Address) -> Result<Account, StoreError> {
        let buffered = self.pending().accounts.get(id).cloned();
        if let Some(account) = buffered {
            return Ok(account);
        }
        Ok(self
            .store
            .load_account(id)
            .await?
            .unwrap_or_else(|| Account::new(id.clone())))
    }

    pub fn save_account(&self, account: &Account) {
        self.pending()
            .accounts
            .insert(account.id.clone(), account.clone());
    }

    // =========================================================================
    // Protocol config operations
    // =========================================================================

    pub async fn load_or_create_protocol_config(&self) -> Result<ProtocolConfig, StoreError> {
        let buffered = self.pending().protocol_config.clone();
        if let Some(config) = buffered {
            return Ok(config);
        }
        Ok(self
            .store
            .load_protocol_config()
            .await?
            .unwrap_or_default())
    }

    pub fn save_protocol_config(&self, config: &ProtocolConfig) {
        self.pending().protocol_config = Some(config.clone());
    }

    // =========================================================================
    // Record operations
    // =========================================================================

    /// Queue a historical record unless one with the same id exists.
    ///
    /// Returns `false` for a duplicate; the stored record is left as it was.
    ///
    /// # Errors
    /// Returns an error if the existence check fails.
    pub async fn insert_record(&self, record: &HistoricalRecord) -> Result<bool, StoreError> {
        let queued = self.pending().has_record(&record.id);
        if queued || self.store.load_record(&record.id).await?.is_some() {
            debug!(id = %record.id, kind = %record.kind(), "Record already exists");
            return Ok(false);
        }
        self.pending().records.push(record.clone());
        Ok(true)
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("has_pending_writes", &self.has_pending_writes())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::domain::{Decimal, EventId, RecordBody, TxHash};

    fn addr(last: char) -> Address {
        Address::parse(&format!("0x{}{}", "0".repeat(39), last)).unwrap()
    }

    fn record(amount: u64) -> HistoricalRecord {
        HistoricalRecord {
            id: EventId::new(TxHash::parse(&format!("0x{}", "f".repeat(64))).unwrap(), 1),
            market: addr('1'),
            block_number: 1,
            block_time: 1,
            body: RecordBody::Transfer {
                amount: Decimal::from(amount),
                from: addr('2'),
                to: addr('3'),
                market_symbol: "cDAI".to_string(),
            },
        }
    }

    #[tokio::test]
    async fn test_saves_are_visible_before_commit_and_stored_after() {
        let memory = Arc::new(MemoryStore::new());
        let repo = Repository::new(memory.clone());

        let mut account = repo.load_or_create_account(&addr('1')).await.unwrap();
        assert_eq!(account, Account::new(addr('1')));
        account.count_liquidator = 2;
        repo.save_account(&account);

        let buffered = repo.load_or_create_account(&addr('1')).await.unwrap();
        assert_eq!(buffered.count_liquidator, 2);
        assert_eq!(memory.account_count(), 0);
        assert!(repo.has_pending_writes());

        repo.commit().await.unwrap();
        assert_eq!(memory.account_count(), 1);
        assert!(!repo.has_pending_writes());
    }

    #[tokio::test]
    async fn test_discard_drops_pending_writes() {
        let memory = Arc::new(MemoryStore::new());
        let repo = Repository::new(memory.clone());
        repo.save_market(&Market::new(addr('1')));
        repo.discard();
        repo.commit().await.unwrap();

        assert!(repo.market(&addr('1')).await.unwrap().is_none());
        assert_eq!(memory.market_count(), 0);
    }

    #[tokio::test]
    async fn test_insert_record_rejects_queued_and_stored_duplicates() {
        let memory = Arc::new(MemoryStore::new());
        let repo = Repository::new(memory.clone());

        assert!(repo.insert_record(&record(1)).await.unwrap());
        assert!(!repo.insert_record(&record(2)).await.unwrap());
        repo.commit().await.unwrap();
        assert!(!repo.insert_record(&record(3)).await.unwrap());
        repo.commit().await.unwrap();

        assert_eq!(memory.records(), vec![record(1)]);
    }

    #[tokio::test]
    async fn test_protocol_config_defaults_to_singleton_id() {
        let repo = Repository::new(Arc::new(MemoryStore::new()));
        let config = repo.load_or_create_protocol_config().await.unwrap();
        assert_eq!(config.id, crate::domain::PROTOCOL_CONFIG_ID);
        assert!(config.price_oracle.is_none());
    }

    #[tokio::test]
    async fn test_unknown_market_is_none() {
        let repo = Repository::new(Arc::new(MemoryStore::new()));
        assert!(repo.market(&addr('1')).await.unwrap().is_none());
    }
}
