//! Structured entity keys and their canonical string form.
//!
//! Every component is validated hex (`Address`, `TxHash`) or a decimal
//! integer, none of which can contain the `-` separator, so the joined
//! string is unambiguous.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::primitives::{Address, TxHash};

const SEPARATOR: char = '-';

/// Identifier of the protocol-config singleton.
pub const PROTOCOL_CONFIG_ID: &str = "1";

/// One account's holdings within one market.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionId {
    pub market: Address,
    pub account: Address,
}

impl PositionId {
    pub fn new(market: Address, account: Address) -> Self {
        Self { market, account }
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.market, SEPARATOR, self.account)
    }
}

/// Historical record key: one per (transaction hash, transaction log index).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId {
    pub tx_hash: TxHash,
    pub tx_log_index: u64,
}

impl EventId {
    pub fn new(tx_hash: TxHash, tx_log_index: u64) -> Self {
        Self {
            tx_hash,
            tx_log_index,
        }
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.tx_hash, SEPARATOR, self.tx_log_index)
    }
}

/// Position snapshot key: one per (position, transaction, block log index).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionTransactionId {
    pub position: PositionId,
    pub tx_hash: TxHash,
    pub log_index: u64,
}

impl PositionTransactionId {
    pub fn new(position: PositionId, tx_hash: TxHash, log_index: u64) -> Self {
        Self {
            position,
            tx_hash,
            log_index,
        }
    }
}

impl fmt::Display for PositionTransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}{}",
            self.position, SEPARATOR, self.tx_hash, SEPARATOR, self.log_index
        )
    }
}
