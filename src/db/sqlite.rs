//! SQLite-backed entity store.

use super::store::{EntityStore, StoreError, WriteBatch};
use crate::domain::{
    Account, Address, EventId, HistoricalRecord, Market, Position, PositionId,
    PositionTransaction, PositionTransactionId, ProtocolConfig, RecordKind, PROTOCOL_CONFIG_ID,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sqlx::sqlite::{SqliteConnection, SqlitePool};
use sqlx::Row;

/// Entity store persisting JSON documents in SQLite.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteStore { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn load_doc<T: DeserializeOwned>(
        &self,
        sql: &str,
        id: &str,
    ) -> Result<Option<T>, StoreError> {
        let row = sqlx::query(sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let data: String = row.get("data");
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => Ok(None),
        }
    }

    /// Records of one kind ordered by block then id.
    pub async fn query_records(
        &self,
        kind: RecordKind,
    ) -> Result<Vec<HistoricalRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT data FROM event_records
            WHERE kind = ?
            ORDER BY block_number ASC, tx_hash ASC, tx_log_index ASC
            "#,
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let data: String = row.get("data");
                serde_json::from_str(&data).map_err(StoreError::from)
            })
            .collect()
    }

    /// Positions held by an account, ordered by market.
    pub async fn query_positions_for_account(
        &self,
        account: &Address,
    ) -> Result<Vec<Position>, StoreError> {
        let rows = sqlx::query(
            "SELECT data FROM positions WHERE account_id = ? ORDER BY market_id ASC",
        )
        .bind(account.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let data: String = row.get("data");
                serde_json::from_str(&data).map_err(StoreError::from)
            })
            .collect()
    }
}

#[async_trait]
impl EntityStore for SqliteStore {
    async fn load_market(&self, id: &Address) -> Result<Option<Market>, StoreError> {
        self.load_doc("SELECT data FROM markets WHERE id = ?", id.as_str())
            .await
    }

    async fn load_account(&self, id: &Address) -> Result<Option<Account>, StoreError> {
        self.load_doc("SELECT data FROM accounts WHERE id = ?", id.as_str())
            .await
    }

    async fn load_position(&self, id: &PositionId) -> Result<Option<Position>, StoreError> {
        self.load_doc("SELECT data FROM positions WHERE id = ?", &id.to_string())
            .await
    }

    async fn load_position_transaction(
        &self,
        id: &PositionTransactionId,
    ) -> Result<Option<PositionTransaction>, StoreError> {
        self.load_doc(
            "SELECT data FROM position_transactions WHERE id = ?",
            &id.to_string(),
        )
        .await
    }

    async fn load_protocol_config(&self) -> Result<Option<ProtocolConfig>, StoreError> {
        self.load_doc(
            "SELECT data FROM protocol_config WHERE id = ?",
            PROTOCOL_CONFIG_ID,
        )
        .await
    }

    async fn load_record(&self, id: &EventId) -> Result<Option<HistoricalRecord>, StoreError> {
        self.load_doc("SELECT data FROM event_records WHERE id = ?", &id.to_string())
            .await
    }

    /// One transaction per batch. Any failure rolls the whole batch back.
    async fn commit(&self, batch: &WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let now = chrono::Utc::now().timestamp_millis();
        let mut tx = self.pool.begin().await?;

        for market in batch.markets.values() {
            upsert_market(&mut tx, market, now).await?;
        }
        for account in batch.accounts.values() {
            upsert_account(&mut tx, account, now).await?;
        }
        for position in batch.positions.values() {
            upsert_position(&mut tx, position, now).await?;
        }
        for transaction in batch.position_transactions.values() {
            insert_position_transaction(&mut tx, transaction, now).await?;
        }
        if let Some(config) = &batch.protocol_config {
            upsert_protocol_config(&mut tx, config, now).await?;
        }
        for record in &batch.records {
            insert_record(&mut tx, record, now).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

fn to_sql_int(field: &'static str, value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::OutOfRange { field, value })
}

async fn upsert_market(
    conn: &mut SqliteConnection,
    market: &Market,
    now: i64,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO markets (id, symbol, data, updated_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            symbol = excluded.symbol,
            data = excluded.data,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(market.id.as_str())
    .bind(&market.symbol)
    .bind(serde_json::to_string(market)?)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn upsert_account(
    conn: &mut SqliteConnection,
    account: &Account,
    now: i64,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO accounts (id, data, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            data = excluded.data,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(account.id.as_str())
    .bind(serde_json::to_string(account)?)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn upsert_position(
    conn: &mut SqliteConnection,
    position: &Position,
    now: i64,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO positions (id, market_id, account_id, data, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            data = excluded.data,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(position.id.to_string())
    .bind(position.id.market.as_str())
    .bind(position.id.account.as_str())
    .bind(serde_json::to_string(position)?)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_position_transaction(
    conn: &mut SqliteConnection,
    transaction: &PositionTransaction,
    now: i64,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO position_transactions (id, position_id, tx_hash, log_index, data, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO NOTHING
        "#,
    )
    .bind(transaction.id.to_string())
    .bind(transaction.id.position.to_string())
    .bind(transaction.tx_hash.as_str())
    .bind(to_sql_int("log_index", transaction.log_index)?)
    .bind(serde_json::to_string(transaction)?)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn upsert_protocol_config(
    conn: &mut SqliteConnection,
    config: &ProtocolConfig,
    now: i64,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO protocol_config (id, data, updated_at)
        VALUES (?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            data = excluded.data,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&config.id)
    .bind(serde_json::to_string(config)?)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn insert_record(
    conn: &mut SqliteConnection,
    record: &HistoricalRecord,
    now: i64,
) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        INSERT INTO event_records (
            id, kind, market_id, tx_hash, tx_log_index,
            block_number, block_time, data, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO NOTHING
        "#,
    )
    .bind(record.id.to_string())
    .bind(record.kind().as_str())
    .bind(record.market.as_str())
    .bind(record.id.tx_hash.as_str())
    .bind(to_sql_int("tx_log_index", record.id.tx_log_index)?)
    .bind(to_sql_int("block_number", record.block_number)?)
    .bind(to_sql_int("block_time", record.block_time)?)
    .bind(serde_json::to_string(record)?)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
