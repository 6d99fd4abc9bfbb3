//! Domain types for the lending-protocol ledger.
//!
//! This module provides:
//! - Exact base-10 arithmetic via the Decimal wrapper
//! - Primitives: Address, TxHash, RawUint
//! - Structured entity keys with canonical string forms
//! - Entities (Market, Account, Position, PositionTransaction, ProtocolConfig)
//! - Typed events and the immutable historical records they produce

pub mod account;
pub mod decimal;
pub mod event;
pub mod keys;
pub mod market;
pub mod ordering;
pub mod primitives;
pub mod protocol;
pub mod records;

pub use account::{Account, Position, PositionTransaction};
pub use decimal::{scale, Decimal, MANTISSA_DECIMALS, MARKET_TOKEN_DECIMALS, ORACLE_DECIMALS};
pub use event::{Event, EventKind, EventMeta};
pub use keys::{EventId, PositionId, PositionTransactionId, PROTOCOL_CONFIG_ID};
pub use market::Market;
pub use ordering::EventOrderingKey;
pub use primitives::{Address, PrimitiveParseError, RawUint, TxHash};
pub use protocol::ProtocolConfig;
pub use records::{HistoricalRecord, RecordBody, RecordKind};
