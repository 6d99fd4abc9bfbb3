pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;

pub use config::Config;
pub use datasource::{
    ChainReader, DataSourceRegistry, ExternalReads, MockChainReader, ReadError, RpcChainReader,
};
pub use db::{init_db, EntityStore, MemoryStore, Repository, SqliteStore, StoreError};
pub use domain::{Address, Decimal, Event, EventKind, EventMeta, RawUint, TxHash};
pub use engine::{Engine, EngineSettings, Outcome, SkipReason};
pub use error::EngineError;
