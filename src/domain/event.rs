//! Typed protocol events as delivered by the host.

use serde::{Deserialize, Serialize};

use super::keys::EventId;
use super::primitives::{Address, RawUint, TxHash};

/// Log context shared by every event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMeta {
    /// Emitting contract.
    pub address: Address,
    pub tx_hash: TxHash,
    /// Position of the transaction within its block.
    pub tx_index: u64,
    /// Position of the log within its block.
    pub log_index: u64,
    /// Position of the log within its transaction.
    pub tx_log_index: u64,
    pub block_number: u64,
    pub block_timestamp: u64,
}

impl EventMeta {
    /// Key of the historical record this log produces.
    pub fn event_id(&self) -> EventId {
        EventId::new(self.tx_hash.clone(), self.tx_log_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub meta: EventMeta,
    pub kind: EventKind,
}

/// Event parameters, one variant per handled log.
///
/// Comptroller events name the market explicitly; market events are
/// emitted by the market contract itself (`EventMeta::address`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    MarketListed {
        market: Address,
    },
    MarketEntered {
        market: Address,
        account: Address,
    },
    MarketExited {
        market: Address,
        account: Address,
    },
    NewCloseFactor {
        new_close_factor_mantissa: RawUint,
    },
    NewCollateralFactor {
        market: Address,
        new_collateral_factor_mantissa: RawUint,
    },
    NewLiquidationIncentive {
        new_liquidation_incentive_mantissa: RawUint,
    },
    NewPriceOracle {
        new_price_oracle: Address,
    },
    CompSpeedUpdated {
        market: Address,
        new_speed: RawUint,
    },
    Mint {
        minter: Address,
        mint_amount: RawUint,
        mint_tokens: RawUint,
    },
    Redeem {
        redeemer: Address,
        redeem_amount: RawUint,
        redeem_tokens: RawUint,
    },
    Borrow {
        borrower: Address,
        borrow_amount: RawUint,
        account_borrows: RawUint,
        total_borrows: RawUint,
    },
    RepayBorrow {
        payer: Address,
        borrower: Address,
        repay_amount: RawUint,
        account_borrows: RawUint,
        total_borrows: RawUint,
    },
    LiquidateBorrow {
        liquidator: Address,
        borrower: Address,
        repay_amount: RawUint,
        collateral_market: Address,
        seize_tokens: RawUint,
    },
    Transfer {
        from: Address,
        to: Address,
        amount: RawUint,
    },
    AccrueInterest {
        cash_prior: RawUint,
        interest_accumulated: RawUint,
        borrow_index: RawUint,
        total_borrows: RawUint,
    },
    NewReserveFactor {
        new_reserve_factor_mantissa: RawUint,
    },
    NewRewardPerBlock {
        new_reward_per_block: RawUint,
    },
    ReservesAdded {
        benefactor: Address,
        add_amount: RawUint,
        new_total_reserves: RawUint,
    },
    ReservesReduced {
        admin: Address,
        reduce_amount: RawUint,
        new_total_reserves: RawUint,
    },
    NewMarketInterestRateModel {
        new_interest_rate_model: Address,
    },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::MarketListed { .. } => "MarketListed",
            EventKind::MarketEntered { .. } => "MarketEntered",
            EventKind::MarketExited { .. } => "MarketExited",
            EventKind::NewCloseFactor { .. } => "NewCloseFactor",
            EventKind::NewCollateralFactor { .. } => "NewCollateralFactor",
            EventKind::NewLiquidationIncentive { .. } => "NewLiquidationIncentive",
            EventKind::NewPriceOracle { .. } => "NewPriceOracle",
            EventKind::CompSpeedUpdated { .. } => "CompSpeedUpdated",
            EventKind::Mint { .. } => "Mint",
            EventKind::Redeem { .. } => "Redeem",
            EventKind::Borrow { .. } => "Borrow",
            EventKind::RepayBorrow { .. } => "RepayBorrow",
            EventKind::LiquidateBorrow { .. } => "LiquidateBorrow",
            EventKind::Transfer { .. } => "Transfer",
            EventKind::AccrueInterest { .. } => "AccrueInterest",
            EventKind::NewReserveFactor { .. } => "NewReserveFactor",
            EventKind::NewRewardPerBlock { .. } => "NewRewardPerBlock",
            EventKind::ReservesAdded { .. } => "ReservesAdded",
            EventKind::ReservesReduced { .. } => "ReservesReduced",
            EventKind::NewMarketInterestRateModel { .. } => "NewMarketInterestRateModel",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_deserializes_from_json_line() {
        let line = r#"{
            "meta": {
                "address": "0x697B4ACAA24430F254224EB794D2A85BA1FA1FB8",
                "tx_hash": "0x1111111111111111111111111111111111111111111111111111111111111111",
                "tx_index": 3,
                "log_index": 40,
                "tx_log_index": 2,
                "block_number": 12000000,
                "block_timestamp": 1617000000
            },
            "kind": {
                "Mint": {
                    "minter": "0x00000000000000000000000000000000000000aa",
                    "mint_amount": "50000000000000000000",
                    "mint_tokens": "0x2540be400"
                }
            }
        }"#;

        let event: Event = serde_json::from_str(line).unwrap();
        assert_eq!(event.kind.name(), "Mint");
        assert_eq!(
            event.meta.address.as_str(),
            "0x697b4acaa24430f254224eb794d2a85ba1fa1fb8"
        );
        match event.kind {
            EventKind::Mint { mint_tokens, .. } => {
                assert_eq!(mint_tokens, RawUint::from(10_000_000_000))
            }
            other => panic!("unexpected kind {:?}", other),
        }
        assert!(event.meta.event_id().to_string().ends_with("-2"));
    }

    #[test]
    fn test_event_rejects_bad_address() {
        let line = r#"{"meta":{"address":"0x12","tx_hash":"0x00","tx_index":0,"log_index":0,"tx_log_index":0,"block_number":1,"block_timestamp":1},"kind":{"MarketListed":{"market":"0x12"}}}"#;
        assert!(serde_json::from_str::<Event>(line).is_err());
    }
}
