use crate::db::StoreError;
use thiserror::Error;

/// Failures that halt event processing.
///
/// Unknown markets and failed contract reads are not errors; they surface as
/// skipped outcomes and default values.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Store(StoreError::Database(err))
    }
}
