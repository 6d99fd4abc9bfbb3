//! AccrueInterest and single-field market parameter updates.

use super::{unknown_market, Engine, Outcome};
use crate::db::StoreError;
use crate::domain::{Address, Decimal, EventMeta, Market, RawUint, MANTISSA_DECIMALS};

/// Per-block rate as a decimal, and annualized over `blocks_per_year`.
fn rates(raw_per_block: &RawUint, blocks_per_year: u64) -> (Decimal, Decimal) {
    let per_block = Decimal::from_raw(raw_per_block, MANTISSA_DECIMALS);
    let annual = (&per_block * &Decimal::from(blocks_per_year)).truncate(MANTISSA_DECIMALS);
    (per_block, annual)
}

impl Engine {
    pub(super) async fn handle_accrue_interest(
        &self,
        meta: &EventMeta,
        cash_prior: &RawUint,
        interest_accumulated: &RawUint,
        borrow_index: &RawUint,
        total_borrows: &RawUint,
    ) -> Result<Outcome, StoreError> {
        let Some(mut market) = self.repo.market(&meta.address).await? else {
            return Ok(unknown_market(&meta.address));
        };
        let block_number = meta.block_number;

        let oracle = self.price_oracle().await?;
        market.underlying_price = self
            .oracle_price(oracle.as_ref(), &market, block_number)
            .await;
        market.accrual_block_number = block_number;
        market.block_timestamp = meta.block_timestamp;

        market.cash = market.underlying_units(cash_prior);
        market.total_interest_accumulated_exact =
            &market.total_interest_accumulated_exact + interest_accumulated;
        market.total_interest_accumulated =
            market.underlying_units(&market.total_interest_accumulated_exact);
        market.borrow_index =
            Decimal::from_raw(borrow_index, MANTISSA_DECIMALS).truncate(MANTISSA_DECIMALS);
        market.total_borrows = market.underlying_units(total_borrows);

        let (per_block, annual) = rates(
            &self
                .reads
                .borrow_rate_per_block(&market.id, block_number)
                .await
                .value(),
            self.settings.blocks_per_year,
        );
        market.borrow_rate_per_block = per_block;
        market.borrow_rate = annual;

        // A failed read defaults to zero, which zeroes both supply fields.
        let (per_block, annual) = rates(
            &self
                .reads
                .supply_rate_per_block(&market.id, block_number)
                .await
                .value(),
            self.settings.blocks_per_year,
        );
        market.supply_rate_per_block = per_block;
        market.supply_rate = annual;

        market.refresh_reserves();
        self.repo.save_market(&market);
        Ok(Outcome::Applied)
    }

    pub(super) async fn handle_reserve_factor(
        &self,
        meta: &EventMeta,
        mantissa: &RawUint,
    ) -> Result<Outcome, StoreError> {
        self.update_market(meta, |market| {
            market.reserve_factor =
                Decimal::from_raw(mantissa, MANTISSA_DECIMALS).truncate(MANTISSA_DECIMALS);
        })
        .await
    }

    pub(super) async fn handle_reward_per_block(
        &self,
        meta: &EventMeta,
        reward: &RawUint,
    ) -> Result<Outcome, StoreError> {
        self.update_market(meta, |market| {
            market.reward_per_block = market.underlying_units(reward);
        })
        .await
    }

    /// ReservesAdded / ReservesReduced carry the new total, which overrides
    /// the derived value.
    pub(super) async fn handle_reserves_report(
        &self,
        meta: &EventMeta,
        new_total_reserves: &RawUint,
    ) -> Result<Outcome, StoreError> {
        self.update_market(meta, |market| {
            market.total_reserves = market.underlying_units(new_total_reserves);
        })
        .await
    }

    pub(super) async fn handle_interest_rate_model(
        &self,
        meta: &EventMeta,
        model: &Address,
    ) -> Result<Outcome, StoreError> {
        self.update_market(meta, |market| {
            market.interest_rate_model_address = model.clone();
        })
        .await
    }

    async fn update_market(
        &self,
        meta: &EventMeta,
        update: impl FnOnce(&mut Market),
    ) -> Result<Outcome, StoreError> {
        let Some(mut market) = self.repo.market(&meta.address).await? else {
            return Ok(unknown_market(&meta.address));
        };
        update(&mut market);
        self.repo.save_market(&market);
        Ok(Outcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_rates_annualize_and_truncate() {
        // 1e10 per block = 1e-8 per block.
        let (per_block, annual) = rates(&RawUint::from_str("10000000000").unwrap(), 2_336_000);
        assert_eq!(per_block, Decimal::from_str_canonical("0.00000001").unwrap());
        assert_eq!(annual, Decimal::from_str_canonical("0.02336").unwrap());
    }

    #[test]
    fn test_rates_of_zero_are_zero() {
        let (per_block, annual) = rates(&RawUint::zero(), 2_336_000);
        assert!(per_block.is_zero());
        assert!(annual.is_zero());
    }
}
