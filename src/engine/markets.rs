//! Market listing and creation.

use super::{Engine, Outcome, SkipReason};
use crate::db::StoreError;
use crate::domain::{Address, Decimal, EventMeta, Market, MANTISSA_DECIMALS};
use tracing::{info, warn};

const NATIVE_UNDERLYING_NAME: &str = "Ether";
const NATIVE_UNDERLYING_SYMBOL: &str = "ETH";
const NATIVE_UNDERLYING_DECIMALS: u32 = 18;
const NATIVE_MARKET_DECIMALS: u32 = 8;

impl Engine {
    pub(super) async fn handle_market_listed(
        &self,
        meta: &EventMeta,
        market: &Address,
    ) -> Result<Outcome, StoreError> {
        if self.settings.invalid_markets.contains(market) {
            return Ok(Outcome::Skipped(SkipReason::ExcludedMarket(market.clone())));
        }
        if self.repo.market(market).await?.is_some() {
            return Ok(Outcome::Skipped(SkipReason::AlreadyListed(market.clone())));
        }

        self.registry.subscribe(market);

        match self.create_market(market, meta.block_number).await {
            Some(created) => {
                info!(
                    market = %created.id,
                    symbol = %created.symbol,
                    underlying = %created.underlying_address,
                    "Market listed"
                );
                self.repo.save_market(&created);
                Ok(Outcome::Applied)
            }
            None => Ok(Outcome::Skipped(SkipReason::MarketCreationFailed(
                market.clone(),
            ))),
        }
    }

    /// Build a market from chain reads at `block_number`.
    ///
    /// Returns `None` for excluded markets and for standard markets whose
    /// `underlying()` or `symbol()` read fails. Every other read falls back to
    /// its default.
    pub async fn create_market(&self, address: &Address, block_number: u64) -> Option<Market> {
        if self.settings.invalid_markets.contains(address) {
            return None;
        }

        let mut market = Market::new(address.clone());
        match &self.settings.native_market {
            Some(native) if &native.address == address => {
                market.name = native.name.clone();
                market.symbol = native.symbol.clone();
                market.decimals = NATIVE_MARKET_DECIMALS;
                market.underlying_address = Address::zero();
                market.underlying_name = NATIVE_UNDERLYING_NAME.to_string();
                market.underlying_symbol = NATIVE_UNDERLYING_SYMBOL.to_string();
                market.underlying_decimals = NATIVE_UNDERLYING_DECIMALS;
            }
            _ => {
                let Some(underlying) = self.reads.underlying(address, block_number).await.ok() else {
                    warn!(market = %address, "underlying() read failed, not creating market");
                    return None;
                };
                let Some(symbol) = self.reads.symbol(address, block_number).await.ok() else {
                    warn!(market = %address, "symbol() read failed, not creating market");
                    return None;
                };

                market.name = self.reads.name(address, block_number).await.value();
                market.symbol = symbol;
                market.decimals = self.reads.decimals(address, block_number).await.value();
                market.underlying_name = self.reads.name(&underlying, block_number).await.value();
                market.underlying_symbol =
                    self.reads.symbol(&underlying, block_number).await.value();
                market.underlying_decimals =
                    self.reads.decimals(&underlying, block_number).await.value();
                market.underlying_address = underlying;
            }
        }

        market.interest_rate_model_address = self
            .reads
            .interest_rate_model(address, block_number)
            .await
            .value();
        market.reserve_factor = Decimal::from_raw(
            &self.reads.reserve_factor(address, block_number).await.value(),
            MANTISSA_DECIMALS,
        );
        market.reward_per_block = Decimal::from_raw(
            &self.reads.reward_per_block(address, block_number).await.value(),
            MANTISSA_DECIMALS,
        );
        market.comp_speed = Decimal::from_raw(
            &self
                .reads
                .comp_speed(&self.settings.comptroller, address, block_number)
                .await
                .value(),
            MANTISSA_DECIMALS,
        );

        Some(market)
    }
}
