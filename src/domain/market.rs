//! Market entity: one lending pool for one underlying asset.

use serde::{Deserialize, Serialize};

use super::decimal::Decimal;
use super::primitives::{Address, RawUint};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    /// Market contract address.
    pub id: Address,
    pub name: String,
    pub symbol: String,
    /// Market-token decimals.
    pub decimals: u32,

    pub underlying_address: Address,
    pub underlying_name: String,
    pub underlying_symbol: String,
    pub underlying_decimals: u32,
    /// Oracle price of one underlying unit in the reference unit.
    pub underlying_price: Decimal,

    pub cash: Decimal,
    pub total_borrows: Decimal,
    pub total_supply: Decimal,
    pub exchange_rate: Decimal,
    pub total_reserves: Decimal,
    pub reserve_factor: Decimal,
    pub collateral_factor: Decimal,

    /// Annualized rates.
    pub borrow_rate: Decimal,
    pub supply_rate: Decimal,
    pub borrow_rate_per_block: Decimal,
    pub supply_rate_per_block: Decimal,
    pub borrow_index: Decimal,

    pub interest_rate_model_address: Address,
    pub reward_per_block: Decimal,
    pub comp_speed: Decimal,

    pub accrual_block_number: u64,
    pub block_timestamp: u64,
    pub total_interest_accumulated_exact: RawUint,
    pub total_interest_accumulated: Decimal,
}

impl Market {
    /// A market with static metadata unset and all accounting fields zeroed.
    pub fn new(id: Address) -> Self {
        Self {
            id,
            name: String::new(),
            symbol: String::new(),
            decimals: 0,
            underlying_address: Address::zero(),
            underlying_name: String::new(),
            underlying_symbol: String::new(),
            underlying_decimals: 0,
            underlying_price: Decimal::zero(),
            cash: Decimal::zero(),
            total_borrows: Decimal::zero(),
            total_supply: Decimal::zero(),
            exchange_rate: Decimal::zero(),
            total_reserves: Decimal::zero(),
            reserve_factor: Decimal::zero(),
            collateral_factor: Decimal::zero(),
            borrow_rate: Decimal::zero(),
            supply_rate: Decimal::zero(),
            borrow_rate_per_block: Decimal::zero(),
            supply_rate_per_block: Decimal::zero(),
            borrow_index: Decimal::zero(),
            interest_rate_model_address: Address::zero(),
            reward_per_block: Decimal::zero(),
            comp_speed: Decimal::zero(),
            accrual_block_number: 0,
            block_timestamp: 0,
            total_interest_accumulated_exact: RawUint::zero(),
            total_interest_accumulated: Decimal::zero(),
        }
    }

    /// `cash + total_borrows - exchange_rate * total_supply`.
    pub fn derived_reserves(&self) -> Decimal {
        &(&self.cash + &self.total_borrows) - &(&self.exchange_rate * &self.total_supply)
    }

    /// Recompute `total_reserves` from the accounting identity.
    pub fn refresh_reserves(&mut self) {
        self.total_reserves = self.derived_reserves();
    }

    /// Convert a raw underlying amount to units at the underlying precision.
    pub fn underlying_units(&self, raw: &RawUint) -> Decimal {
        Decimal::from_raw(raw, self.underlying_decimals).truncate(self.underlying_decimals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    #[test]
    fn test_new_market_is_zeroed() {
        let market = Market::new(Address::zero());
        assert!(market.cash.is_zero());
        assert!(market.total_reserves.is_zero());
        assert!(market.total_interest_accumulated_exact.is_zero());
        assert!(market.interest_rate_model_address.is_zero());
    }

    #[test]
    fn test_refresh_reserves_applies_identity() {
        let mut market = Market::new(Address::zero());
        market.cash = d("50");
        market.total_borrows = d("30");
        market.exchange_rate = d("0.5");
        market.total_supply = d("150");
        market.refresh_reserves();
        assert_eq!(market.total_reserves, d("5"));
    }

    #[test]
    fn test_underlying_units_truncates_to_underlying_decimals() {
        let mut market = Market::new(Address::zero());
        market.underlying_decimals = 6;
        let raw = RawUint::from_str("1234567").unwrap();
        assert_eq!(market.underlying_units(&raw), d("1.234567"));
    }
}
