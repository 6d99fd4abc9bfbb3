//! Mint and Redeem.
//!
//! Token balances are not touched here; the co-emitted Transfer moves them.

use super::{unknown_market, Engine, Outcome};
use crate::db::StoreError;
use crate::domain::{
    Address, Decimal, EventMeta, HistoricalRecord, Market, RawUint, RecordBody, MANTISSA_DECIMALS,
    MARKET_TOKEN_DECIMALS,
};

/// Market-token and underlying amounts of a Mint or Redeem.
fn supply_amounts(market: &Market, underlying: &RawUint, tokens: &RawUint) -> (Decimal, Decimal) {
    let tokens = Decimal::from_raw(tokens, market.decimals).truncate(MARKET_TOKEN_DECIMALS);
    let underlying = market.underlying_units(underlying);
    (tokens, underlying)
}

fn implied_exchange_rate(underlying: &Decimal, tokens: &Decimal) -> Option<Decimal> {
    underlying
        .checked_div(tokens)
        .map(|rate| rate.truncate(MANTISSA_DECIMALS))
}

impl Engine {
    pub(super) async fn handle_mint(
        &self,
        meta: &EventMeta,
        minter: &Address,
        mint_amount: &RawUint,
        mint_tokens: &RawUint,
    ) -> Result<Outcome, StoreError> {
        let Some(mut market) = self.repo.market(&meta.address).await? else {
            return Ok(unknown_market(&meta.address));
        };

        let (tokens, underlying) = supply_amounts(&market, mint_amount, mint_tokens);
        if tokens.is_positive() {
            if let Some(rate) = implied_exchange_rate(&underlying, &tokens) {
                market.exchange_rate = rate;
            }
            market.total_supply = &market.total_supply + &tokens;
            market.cash = &market.cash + &underlying;
            market.refresh_reserves();
            self.repo.save_market(&market);
        }

        let record = HistoricalRecord {
            id: meta.event_id(),
            market: market.id.clone(),
            block_number: meta.block_number,
            block_time: meta.block_timestamp,
            body: RecordBody::Mint {
                amount: tokens,
                minter: minter.clone(),
                market_symbol: market.symbol.clone(),
                underlying_amount: underlying,
            },
        };
        self.repo.insert_record(&record).await?;
        Ok(Outcome::Applied)
    }

    pub(super) async fn handle_redeem(
        &self,
        meta: &EventMeta,
        redeemer: &Address,
        redeem_amount: &RawUint,
        redeem_tokens: &RawUint,
    ) -> Result<Outcome, StoreError> {
        let Some(mut market) = self.repo.market(&meta.address).await? else {
            return Ok(unknown_market(&meta.address));
        };

        let mut changed = false;
        if self
            .settings
            .redeem_price_refresh_markets
            .contains(&market.id)
        {
            let oracle = self.price_oracle().await?;
            market.underlying_price = self
                .oracle_price(oracle.as_ref(), &market, meta.block_number)
                .await;
            market.accrual_block_number = meta.block_number;
            market.block_timestamp = meta.block_timestamp;
            changed = true;
        }

        let (tokens, underlying) = supply_amounts(&market, redeem_amount, redeem_tokens);
        if tokens.is_positive() {
            if let Some(rate) = implied_exchange_rate(&underlying, &tokens) {
                market.exchange_rate = rate;
            }
            market.total_supply = &market.total_supply - &tokens;
            let cash = self.reads.cash(&market.id, meta.block_number).await.value();
            market.cash = market.underlying_units(&cash);
            market.refresh_reserves();
            changed = true;
        }
        if changed {
            self.repo.save_market(&market);
        }

        let record = HistoricalRecord {
            id: meta.event_id(),
            market: market.id.clone(),
            block_number: meta.block_number,
            block_time: meta.block_timestamp,
            body: RecordBody::Redeem {
                amount: tokens,
                redeemer: redeemer.clone(),
                market_symbol: market.symbol.clone(),
                underlying_amount: underlying,
            },
        };
        self.repo.insert_record(&record).await?;
        Ok(Outcome::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn raw(s: &str) -> RawUint {
        RawUint::from_str(s).unwrap()
    }

    #[test]
    fn test_supply_amounts_truncate_to_field_precision() {
        let mut market = Market::new(Address::zero());
        market.decimals = 8;
        market.underlying_decimals = 6;

        let (tokens, underlying) = supply_amounts(&market, &raw("1234567"), &raw("123456789"));
        assert_eq!(tokens, d("1.23456789"));
        assert_eq!(underlying, d("1.234567"));
        assert!(tokens.fractional_digits() <= MARKET_TOKEN_DECIMALS);
    }

    #[test]
    fn test_implied_exchange_rate_truncates_to_mantissa() {
        let rate = implied_exchange_rate(&d("1"), &d("3")).unwrap();
        assert_eq!(rate, d("0.333333333333333333"));
        assert!(implied_exchange_rate(&d("1"), &Decimal::zero()).is_none());
    }
}
