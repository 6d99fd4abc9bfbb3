//! Event reconciliation engine.
//!
//! One handler module per event family, each an `impl Engine` block:
//! - `markets.rs` - Market listing and creation
//! - `comptroller.rs` - Membership, collateral, reward speed and protocol parameters
//! - `supply.rs` - Mint and Redeem
//! - `borrow.rs` - Borrow and RepayBorrow
//! - `liquidation.rs` - LiquidateBorrow
//! - `transfer.rs` - Market-token transfers
//! - `accrual.rs` - AccrueInterest and single-field market updates

mod accrual;
mod borrow;
mod comptroller;
mod liquidation;
mod markets;
mod supply;
mod transfer;

use crate::config::Config;
use crate::datasource::{DataSourceRegistry, ExternalReads};
use crate::db::{Repository, StoreError};
use crate::domain::{
    Address, Decimal, Event, EventKind, EventMeta, EventOrderingKey, Market, Position, PositionId,
    PositionTransaction, PositionTransactionId,
};
use crate::error::EngineError;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Blocks per year assumed when annualizing per-block rates.
pub const DEFAULT_BLOCKS_PER_YEAR: u64 = 2_336_000;

/// Market for the chain's native asset, which has no underlying token contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeMarket {
    pub address: Address,
    pub name: String,
    pub symbol: String,
}

/// Deployment-specific engine parameters.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Target of `compSpeeds` reads.
    pub comptroller: Address,
    pub native_market: Option<NativeMarket>,
    /// Markets that are never created, even when listed.
    pub invalid_markets: HashSet<Address>,
    /// Markets whose Redeem also refreshes price and accrual stamps.
    pub redeem_price_refresh_markets: HashSet<Address>,
    pub blocks_per_year: u64,
}

impl EngineSettings {
    pub fn new(comptroller: Address) -> Self {
        Self {
            comptroller,
            native_market: None,
            invalid_markets: HashSet::new(),
            redeem_price_refresh_markets: HashSet::new(),
            blocks_per_year: DEFAULT_BLOCKS_PER_YEAR,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            comptroller: config.comptroller_address.clone(),
            native_market: config.native_market_address.clone().map(|address| NativeMarket {
                address,
                name: config.native_market_name.clone(),
                symbol: config.native_market_symbol.clone(),
            }),
            invalid_markets: config.invalid_markets.iter().cloned().collect(),
            redeem_price_refresh_markets: config
                .redeem_price_refresh_markets
                .iter()
                .cloned()
                .collect(),
            blocks_per_year: config.blocks_per_year,
        }
    }
}

/// Result of processing one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Skipped(SkipReason),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

/// Why an event left state untouched. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The event refers to a market that was never listed.
    UnknownMarket(Address),
    /// The market is on the exclusion list.
    ExcludedMarket(Address),
    /// The market is already listed.
    AlreadyListed(Address),
    /// Listing reads for underlying or symbol failed.
    MarketCreationFailed(Address),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UnknownMarket(m) => write!(f, "unknown market {}", m),
            SkipReason::ExcludedMarket(m) => write!(f, "excluded market {}", m),
            SkipReason::AlreadyListed(m) => write!(f, "market {} already listed", m),
            SkipReason::MarketCreationFailed(m) => write!(f, "could not create market {}", m),
        }
    }
}

/// Applies events one at a time to the entity store.
pub struct Engine {
    repo: Repository,
    reads: ExternalReads,
    registry: Arc<dyn DataSourceRegistry>,
    settings: EngineSettings,
    last_key: Option<EventOrderingKey>,
}

impl Engine {
    pub fn new(
        repo: Repository,
        reads: ExternalReads,
        registry: Arc<dyn DataSourceRegistry>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            repo,
            reads,
            registry,
            settings,
            last_key: None,
        }
    }

    pub fn repo(&self) -> &Repository {
        &self.repo
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Reconcile one event.
    ///
    /// Events are expected in (block, transaction index, log index) order.
    /// An event behind the latest one seen is logged and still applied.
    /// Everything the event writes is committed together; on failure none of
    /// it reaches the store.
    ///
    /// # Errors
    /// Returns an error only if the entity store fails.
    pub async fn process(&mut self, event: &Event) -> Result<Outcome, EngineError> {
        self.observe_order(event);
        let meta = &event.meta;
        debug!(
            event = event.kind.name(),
            tx = %meta.tx_hash,
            log_index = meta.log_index,
            block_number = meta.block_number,
            "Processing event"
        );

        let outcome = match self.apply(event).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.repo.discard();
                return Err(err.into());
            }
        };
        self.repo.commit().await?;

        if let Outcome::Skipped(reason) = &outcome {
            debug!(
                event = event.kind.name(),
                tx = %meta.tx_hash,
                reason = %reason,
                "Event skipped"
            );
        }
        Ok(outcome)
    }

    async fn apply(&self, event: &Event) -> Result<Outcome, StoreError> {
        let meta = &event.meta;
        let outcome = match &event.kind {
            EventKind::MarketListed { market } => self.handle_market_listed(meta, market).await?,
            EventKind::MarketEntered { market, account } => {
                self.handle_membership(meta, market, account, true).await?
            }
            EventKind::MarketExited { market, account } => {
                self.handle_membership(meta, market, account, false).await?
            }
            EventKind::NewCloseFactor {
                new_close_factor_mantissa,
            } => {
                let value = new_close_factor_mantissa.clone();
                self.upsert_config(|config| config.close_factor_mantissa = Some(value))
                    .await?
            }
            EventKind::NewLiquidationIncentive {
                new_liquidation_incentive_mantissa,
            } => {
                let value = new_liquidation_incentive_mantissa.clone();
                self.upsert_config(|config| config.liquidation_incentive_mantissa = Some(value))
                    .await?
            }
            EventKind::NewPriceOracle { new_price_oracle } => {
                let value = new_price_oracle.clone();
                self.upsert_config(|config| config.price_oracle = Some(value))
                    .await?
            }
            EventKind::NewCollateralFactor {
                market,
                new_collateral_factor_mantissa,
            } => {
                self.handle_collateral_factor(market, new_collateral_factor_mantissa)
                    .await?
            }
            EventKind::CompSpeedUpdated { market, new_speed } => {
                self.handle_comp_speed(market, new_speed).await?
            }
            EventKind::Mint {
                minter,
                mint_amount,
                mint_tokens,
            } => self.handle_mint(meta, minter, mint_amount, mint_tokens).await?,
            EventKind::Redeem {
                redeemer,
                redeem_amount,
                redeem_tokens,
            } => {
                self.handle_redeem(meta, redeemer, redeem_amount, redeem_tokens)
                    .await?
            }
            EventKind::Borrow {
                borrower,
                borrow_amount,
                account_borrows,
                total_borrows,
            } => {
                self.handle_borrow(meta, borrower, borrow_amount, account_borrows, total_borrows)
                    .await?
            }
            EventKind::RepayBorrow {
                payer,
                borrower,
                repay_amount,
                account_borrows,
                total_borrows,
            } => {
                self.handle_repay(
                    meta,
                    payer,
                    borrower,
                    repay_amount,
                    account_borrows,
                    total_borrows,
                )
                .await?
            }
            EventKind::LiquidateBorrow {
                liquidator,
                borrower,
                repay_amount,
                collateral_market,
                seize_tokens,
            } => {
                self.handle_liquidation(
                    meta,
                    liquidator,
                    borrower,
                    repay_amount,
                    collateral_market,
                    seize_tokens,
                )
                .await?
            }
            EventKind::Transfer { from, to, amount } => {
                self.handle_transfer(meta, from, to, amount).await?
            }
            EventKind::AccrueInterest {
                cash_prior,
                interest_accumulated,
                borrow_index,
                total_borrows,
            } => {
                self.handle_accrue_interest(
                    meta,
                    cash_prior,
                    interest_accumulated,
                    borrow_index,
                    total_borrows,
                )
                .await?
            }
            EventKind::NewReserveFactor {
                new_reserve_factor_mantissa,
            } => {
                self.handle_reserve_factor(meta, new_reserve_factor_mantissa)
                    .await?
            }
            EventKind::NewRewardPerBlock {
                new_reward_per_block,
            } => {
                self.handle_reward_per_block(meta, new_reward_per_block)
                    .await?
            }
            EventKind::ReservesAdded {
                new_total_reserves,
                ..
            }
            | EventKind::ReservesReduced {
                new_total_reserves,
                ..
            } => self.handle_reserves_report(meta, new_total_reserves).await?,
            EventKind::NewMarketInterestRateModel {
                new_interest_rate_model,
            } => {
                self.handle_interest_rate_model(meta, new_interest_rate_model)
                    .await?
            }
        };
        Ok(outcome)
    }

    fn observe_order(&mut self, event: &Event) {
        let key = EventOrderingKey::from_event(event);
        match self.last_key {
            Some(last) if key < last => {
                warn!(
                    block_number = key.block_number,
                    tx_index = key.tx_index,
                    log_index = key.log_index,
                    last_block_number = last.block_number,
                    last_tx_index = last.tx_index,
                    last_log_index = last.log_index,
                    "Event arrived out of order"
                );
            }
            _ => self.last_key = Some(key),
        }
    }

    async fn price_oracle(&self) -> Result<Option<Address>, StoreError> {
        Ok(self.repo.load_or_create_protocol_config().await?.price_oracle)
    }

    /// Oracle price of the market's underlying, truncated to its decimals.
    async fn oracle_price(
        &self,
        oracle: Option<&Address>,
        market: &Market,
        block_number: u64,
    ) -> Decimal {
        self.reads
            .underlying_price(oracle, &market.id, market.underlying_decimals, block_number)
            .await
            .value()
            .truncate(market.underlying_decimals)
    }

    /// Load or create the account's position in `market`, snapshot it for this
    /// log and stamp the last-touch block. The caller saves the position.
    async fn touch_position(
        &self,
        market: &Market,
        account: &Address,
        meta: &EventMeta,
    ) -> Result<Position, StoreError> {
        let id = PositionId::new(market.id.clone(), account.clone());
        let mut position = self
            .repo
            .load_or_create_position(&id, &market.symbol)
            .await?;

        let oracle = self.price_oracle().await?;
        let tx_id = PositionTransactionId::new(id, meta.tx_hash.clone(), meta.log_index);
        let snapshot_id = tx_id.clone();
        self.repo
            .get_or_create_position_transaction(&tx_id, move || async move {
                let underlying_price = self
                    .oracle_price(oracle.as_ref(), market, meta.block_number)
                    .await;
                PositionTransaction {
                    id: snapshot_id,
                    tx_hash: meta.tx_hash.clone(),
                    timestamp: meta.block_timestamp,
                    block: meta.block_number,
                    log_index: meta.log_index,
                    underlying_price,
                    exchange_rate: market.exchange_rate.clone(),
                }
            })
            .await?;

        position.accrual_block_number = meta.block_number;
        Ok(position)
    }
}

fn unknown_market(id: &Address) -> Outcome {
    Outcome::Skipped(SkipReason::UnknownMarket(id.clone()))
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("settings", &self.settings)
            .field("last_key", &self.last_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::{LoggingRegistry, MockChainReader};
    use crate::db::MemoryStore;
    use crate::domain::{RawUint, TxHash};

    fn addr(last: char) -> Address {
        Address::parse(&format!("0x{}{}", "0".repeat(39), last)).unwrap()
    }

    fn engine() -> Engine {
        Engine::new(
            Repository::new(Arc::new(MemoryStore::new())),
            ExternalReads::new(Arc::new(MockChainReader::new())),
            Arc::new(LoggingRegistry),
            EngineSettings::new(addr('c')),
        )
    }

    fn event(block_number: u64, log_index: u64, kind: EventKind) -> Event {
        Event {
            meta: EventMeta {
                address: addr('1'),
                tx_hash: TxHash::parse(&format!("0x{}", "a".repeat(64))).unwrap(),
                tx_index: 0,
                log_index,
                tx_log_index: log_index,
                block_number,
                block_timestamp: block_number * 12,
            },
            kind,
        }
    }

    #[tokio::test]
    async fn test_out_of_order_event_is_still_applied() {
        let mut engine = engine();
        let close = |v: u64| EventKind::NewCloseFactor {
            new_close_factor_mantissa: RawUint::from(v),
        };

        engine.process(&event(10, 0, close(1))).await.unwrap();
        let outcome = engine.process(&event(9, 0, close(2))).await.unwrap();
        assert_eq!(outcome, Outcome::Applied);
        assert_eq!(engine.last_key.map(|k| k.block_number), Some(10));

        let config = engine.repo().load_or_create_protocol_config().await.unwrap();
        assert_eq!(config.close_factor_mantissa, Some(RawUint::from(2)));
    }

    #[tokio::test]
    async fn test_market_event_for_unknown_market_is_skipped() {
        let mut engine = engine();
        let outcome = engine
            .process(&event(
                1,
                0,
                EventKind::NewReserveFactor {
                    new_reserve_factor_mantissa: RawUint::from(5),
                },
            ))
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Skipped(SkipReason::UnknownMarket(addr('1'))));
    }

    #[test]
    fn test_settings_defaults() {
        let settings = EngineSettings::new(addr('c'));
        assert_eq!(settings.blocks_per_year, DEFAULT_BLOCKS_PER_YEAR);
        assert!(settings.native_market.is_none());
        assert!(settings.invalid_markets.is_empty());
    }
}
