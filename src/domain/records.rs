//! Immutable historical records, one per (transaction hash, transaction log index).

use serde::{Deserialize, Serialize};

use super::decimal::Decimal;
use super::keys::EventId;
use super::primitives::Address;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    pub id: EventId,
    /// Market contract that emitted the event.
    pub market: Address,
    pub block_number: u64,
    pub block_time: u64,
    pub body: RecordBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Mint,
    Redeem,
    Borrow,
    Repay,
    Liquidation,
    Transfer,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Mint => "mint",
            RecordKind::Redeem => "redeem",
            RecordKind::Borrow => "borrow",
            RecordKind::Repay => "repay",
            RecordKind::Liquidation => "liquidation",
            RecordKind::Transfer => "transfer",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordBody {
    Mint {
        /// Market tokens minted.
        amount: Decimal,
        minter: Address,
        market_symbol: String,
        underlying_amount: Decimal,
    },
    Redeem {
        /// Market tokens redeemed.
        amount: Decimal,
        redeemer: Address,
        market_symbol: String,
        underlying_amount: Decimal,
    },
    Borrow {
        amount: Decimal,
        account_borrows: Decimal,
        borrower: Address,
        underlying_symbol: String,
        underlying_price: Decimal,
        exchange_rate: Decimal,
    },
    Repay {
        amount: Decimal,
        account_borrows: Decimal,
        borrower: Address,
        payer: Address,
        underlying_symbol: String,
        underlying_price: Decimal,
        exchange_rate: Decimal,
    },
    Liquidation {
        liquidator: Address,
        borrower: Address,
        /// Collateral-market tokens seized.
        seize_amount: Decimal,
        seize_market: Address,
        underlying_repay_amount: Decimal,
        underlying_seize_amount: Decimal,
        borrower_remaining_underlying_collateral: Decimal,
        borrower_remaining_borrow_balance: Decimal,
    },
    Transfer {
        amount: Decimal,
        from: Address,
        to: Address,
        market_symbol: String,
    },
}

impl RecordBody {
    pub fn kind(&self) -> RecordKind {
        match self {
            RecordBody::Mint { .. } => RecordKind::Mint,
            RecordBody::Redeem { .. } => RecordKind::Redeem,
            RecordBody::Borrow { .. } => RecordKind::Borrow,
            RecordBody::Repay { .. } => RecordKind::Repay,
            RecordBody::Liquidation { .. } => RecordKind::Liquidation,
            RecordBody::Transfer { .. } => RecordKind::Transfer,
        }
    }
}

impl HistoricalRecord {
    pub fn kind(&self) -> RecordKind {
        self.body.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TxHash;

    #[test]
    fn test_record_kind_serialization() {
        let json = serde_json::to_string(&RecordKind::Liquidation).unwrap();
        assert_eq!(json, "\"liquidation\"");
        assert_eq!(RecordKind::Repay.to_string(), "repay");
    }

    #[test]
    fn test_record_json_roundtrip_keeps_decimals_exact() {
        let record = HistoricalRecord {
            id: EventId::new(TxHash::parse(&format!("0x{}", "b".repeat(64))).unwrap(), 4),
            market: Address::zero(),
            block_number: 100,
            block_time: 1_000,
            body: RecordBody::Transfer {
                amount: Decimal::from_str_canonical("0.000000000000000001").unwrap(),
                from: Address::zero(),
                to: Address::zero(),
                market_symbol: "cDAI".to_string(),
            },
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"0.000000000000000001\""));
        let back: HistoricalRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.kind(), RecordKind::Transfer);
    }
}
