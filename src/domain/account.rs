//! Account, Position and Position-Transaction entities.

use serde::{Deserialize, Serialize};

use super::decimal::Decimal;
use super::keys::{PositionId, PositionTransactionId};
use super::primitives::{Address, TxHash};

/// A protocol participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: Address,
    /// Liquidations this account initiated.
    pub count_liquidator: u32,
    /// Times this account was liquidated.
    pub count_liquidated: u32,
    pub has_borrowed: bool,
}

impl Account {
    pub fn new(id: Address) -> Self {
        Self {
            id,
            count_liquidator: 0,
            count_liquidated: 0,
            has_borrowed: false,
        }
    }
}

/// One account's holdings and debt within one market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    /// Market-token symbol at creation.
    pub symbol: String,
    /// Block of the last event touching this position.
    pub accrual_block_number: u64,
    pub token_balance: Decimal,
    pub total_underlying_supplied: Decimal,
    pub total_underlying_redeemed: Decimal,
    pub total_underlying_borrowed: Decimal,
    pub total_underlying_repaid: Decimal,
    pub stored_borrow_balance: Decimal,
    /// Market borrow index at the last borrow or repay. Kept after full repayment.
    pub account_borrow_index: Decimal,
    pub entered_market: bool,
}

impl Position {
    pub fn new(id: PositionId, symbol: String) -> Self {
        Self {
            id,
            symbol,
            accrual_block_number: 0,
            token_balance: Decimal::zero(),
            total_underlying_supplied: Decimal::zero(),
            total_underlying_redeemed: Decimal::zero(),
            total_underlying_borrowed: Decimal::zero(),
            total_underlying_repaid: Decimal::zero(),
            stored_borrow_balance: Decimal::zero(),
            account_borrow_index: Decimal::zero(),
            entered_market: false,
        }
    }
}

/// Immutable price and exchange-rate snapshot taken when an event touches a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionTransaction {
    pub id: PositionTransactionId,
    pub tx_hash: TxHash,
    pub timestamp: u64,
    pub block: u64,
    pub log_index: u64,
    pub underlying_price: Decimal,
    pub exchange_rate: Decimal,
}
