//! Entity persistence.
//!
//! This module provides:
//! - The `EntityStore` trait with in-memory and SQLite implementations
//! - Database initialization, migrations and pragma configuration
//! - Repository layer with load-or-create semantics

pub mod memory;
pub mod migrations;
pub mod repo;
pub mod sqlite;
pub mod store;

pub use memory::MemoryStore;
pub use migrations::init_db;
pub use repo::Repository;
pub use sqlite::SqliteStore;
pub use store::{EntityStore, StoreError, WriteBatch};
