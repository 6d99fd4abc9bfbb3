//! LiquidateBorrow.
//!
//! Emitted by the repay market. Balances move through the accompanying
//! RepayBorrow and Transfer, so only counters and the record change here.

use super::{unknown_market, Engine, Outcome};
use crate::db::StoreError;
use crate::domain::{
    Address, Decimal, EventMeta, HistoricalRecord, PositionId, RawUint, RecordBody,
    MARKET_TOKEN_DECIMALS,
};

impl Engine {
    pub(super) async fn handle_liquidation(
        &self,
        meta: &EventMeta,
        liquidator: &Address,
        borrower: &Address,
        repay_amount: &RawUint,
        collateral_market: &Address,
        seize_tokens: &RawUint,
    ) -> Result<Outcome, StoreError> {
        let Some(repay_market) = self.repo.market(&meta.address).await? else {
            return Ok(unknown_market(&meta.address));
        };
        let Some(collateral) = self.repo.market(collateral_market).await? else {
            return Ok(unknown_market(collateral_market));
        };

        let mut liquidator_account = self.repo.load_or_create_account(liquidator).await?;
        liquidator_account.count_liquidator += 1;
        self.repo.save_account(&liquidator_account);

        let mut borrower_account = self.repo.load_or_create_account(borrower).await?;
        borrower_account.count_liquidated += 1;
        self.repo.save_account(&borrower_account);

        let seize_amount =
            Decimal::from_raw(seize_tokens, collateral.decimals).truncate(MARKET_TOKEN_DECIMALS);
        let underlying_seize_amount = &collateral.exchange_rate * &seize_amount;
        let underlying_repay_amount = repay_market.underlying_units(repay_amount);

        let remaining_collateral = self
            .repo
            .position(&PositionId::new(collateral.id.clone(), borrower.clone()))
            .await?
            .map(|p| &collateral.exchange_rate * &p.token_balance)
            .unwrap_or_default();
        let remaining_borrow = self
            .repo
            .position(&PositionId::new(repay_market.id.clone(), borrower.clone()))
            .await?
            .map(|p| p.stored_borrow_balance)
            .unwrap_or_default();

        let record = HistoricalRecord {
            id: meta.event_id(),
            market: repay_market.id.clone(),
            block_number: meta.block_number,
            block_time: meta.block_timestamp,
            body: RecordBody::Liquidation {
                liquidator: liquidator.clone(),
                borrower: borrower.clone(),
                seize_amount,
                seize_market: collateral.id.clone(),
                underlying_repay_amount,
                underlying_seize_amount,
                borrower_remaining_underlying_collateral: remaining_collateral,
                borrower_remaining_borrow_balance: remaining_borrow,
            },
        };
        self.repo.insert_record(&record).await?;
        Ok(Outcome::Applied)
    }
}
