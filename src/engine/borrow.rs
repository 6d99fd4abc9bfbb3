//! Borrow and RepayBorrow.

use super::{unknown_market, Engine, Outcome};
use crate::db::StoreError;
use crate::domain::{
    Address, Decimal, EventMeta, HistoricalRecord, Market, Position, RawUint, RecordBody,
};

/// Which side of a debt change an event is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebtChange {
    Borrow,
    Repay,
}

impl Engine {
    pub(super) async fn handle_borrow(
        &self,
        meta: &EventMeta,
        borrower: &Address,
        borrow_amount: &RawUint,
        account_borrows: &RawUint,
        total_borrows: &RawUint,
    ) -> Result<Outcome, StoreError> {
        let Some(mut market) = self.repo.market(&meta.address).await? else {
            return Ok(unknown_market(&meta.address));
        };

        let mut account = self.repo.load_or_create_account(borrower).await?;
        account.has_borrowed = true;
        self.repo.save_account(&account);

        self.refresh_debt_totals(&mut market, meta, total_borrows).await;
        let position = self
            .apply_debt_change(
                &market,
                meta,
                borrower,
                borrow_amount,
                account_borrows,
                DebtChange::Borrow,
            )
            .await?;

        let oracle = self.price_oracle().await?;
        let record = HistoricalRecord {
            id: meta.event_id(),
            market: market.id.clone(),
            block_number: meta.block_number,
            block_time: meta.block_timestamp,
            body: RecordBody::Borrow {
                amount: market.underlying_units(borrow_amount),
                account_borrows: position.stored_borrow_balance,
                borrower: borrower.clone(),
                underlying_symbol: market.underlying_symbol.clone(),
                underlying_price: self
                    .oracle_price(oracle.as_ref(), &market, meta.block_number)
                    .await,
                exchange_rate: market.exchange_rate.clone(),
            },
        };
        self.repo.insert_record(&record).await?;
        Ok(Outcome::Applied)
    }

    pub(super) async fn handle_repay(
        &self,
        meta: &EventMeta,
        payer: &Address,
        borrower: &Address,
        repay_amount: &RawUint,
        account_borrows: &RawUint,
        total_borrows: &RawUint,
    ) -> Result<Outcome, StoreError> {
        let Some(mut market) = self.repo.market(&meta.address).await? else {
            return Ok(unknown_market(&meta.address));
        };

        let account = self.repo.load_or_create_account(borrower).await?;
        self.repo.save_account(&account);

        self.refresh_debt_totals(&mut market, meta, total_borrows).await;
        let position = self
            .apply_debt_change(
                &market,
                meta,
                borrower,
                repay_amount,
                account_borrows,
                DebtChange::Repay,
            )
            .await?;

        let oracle = self.price_oracle().await?;
        let record = HistoricalRecord {
            id: meta.event_id(),
            market: market.id.clone(),
            block_number: meta.block_number,
            block_time: meta.block_timestamp,
            body: RecordBody::Repay {
                amount: market.underlying_units(repay_amount),
                account_borrows: position.stored_borrow_balance,
                borrower: borrower.clone(),
                payer: payer.clone(),
                underlying_symbol: market.underlying_symbol.clone(),
                underlying_price: self
                    .oracle_price(oracle.as_ref(), &market, meta.block_number)
                    .await,
                exchange_rate: market.exchange_rate.clone(),
            },
        };
        self.repo.insert_record(&record).await?;
        Ok(Outcome::Applied)
    }

    /// Total borrows from the event, cash from a live read, then reserves.
    async fn refresh_debt_totals(
        &self,
        market: &mut Market,
        meta: &EventMeta,
        total_borrows: &RawUint,
    ) {
        market.total_borrows = market.underlying_units(total_borrows);
        let cash = self.reads.cash(&market.id, meta.block_number).await.value();
        market.cash = market.underlying_units(&cash);
        market.refresh_reserves();
        self.repo.save_market(market);
    }

    async fn apply_debt_change(
        &self,
        market: &Market,
        meta: &EventMeta,
        borrower: &Address,
        amount: &RawUint,
        account_borrows: &RawUint,
        change: DebtChange,
    ) -> Result<Position, StoreError> {
        let mut position = self.touch_position(market, borrower, meta).await?;
        position.stored_borrow_balance = market.underlying_units(account_borrows);
        position.account_borrow_index = market.borrow_index.clone();

        let amount = Decimal::from_raw(amount, market.underlying_decimals);
        match change {
            DebtChange::Borrow => {
                position.total_underlying_borrowed = &position.total_underlying_borrowed + &amount;
            }
            DebtChange::Repay => {
                position.total_underlying_repaid = &position.total_underlying_repaid + &amount;
            }
        }
        self.repo.save_position(&position);
        Ok(position)
    }
}
