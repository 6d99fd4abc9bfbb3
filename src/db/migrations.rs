//! SQLite setup: connection options and the schema.

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::path::Path;
use std::time::Duration;
use tracing::info;

const MAX_CONNECTIONS: u32 = 5;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open (creating if needed) the ledger database at `db_path` and apply the schema.
///
/// Every connection runs in WAL mode with foreign keys enforced.
///
/// # Errors
/// Fails if the parent directory cannot be created, the database cannot be
/// opened, or a schema statement fails.
pub async fn init_db(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(BUSY_TIMEOUT)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    apply_schema(&pool).await?;
    info!(path = %db_path, "Ledger database ready");
    Ok(pool)
}

/// Create any missing tables and indexes in one transaction.
async fn apply_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut applied = 0usize;
    for statement in include_str!("schema.sql").split(';') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        sqlx::query(statement).execute(&mut *tx).await?;
        applied += 1;
    }
    tx.commit().await?;
    info!(statements = applied, "Schema applied");
    Ok(())
}
