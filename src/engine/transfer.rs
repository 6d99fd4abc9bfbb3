//! Market-token transfers, including the mint and redeem legs where the
//! market contract itself is the counterparty.

use super::{unknown_market, Engine, Outcome};
use crate::db::StoreError;
use crate::domain::{
    Address, Decimal, EventMeta, HistoricalRecord, Market, RawUint, RecordBody,
    MARKET_TOKEN_DECIMALS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Leg {
    Sender,
    Receiver,
}

impl Engine {
    pub(super) async fn handle_transfer(
        &self,
        meta: &EventMeta,
        from: &Address,
        to: &Address,
        amount: &RawUint,
    ) -> Result<Outcome, StoreError> {
        let Some(market) = self.repo.market(&meta.address).await? else {
            return Ok(unknown_market(&meta.address));
        };

        let units = Decimal::from_raw(amount, market.decimals);
        let tokens = units.truncate(MARKET_TOKEN_DECIMALS);
        let underlying = (&market.exchange_rate * &units).truncate(market.underlying_decimals);

        if from != &market.id {
            self.apply_leg(&market, meta, from, &tokens, &underlying, Leg::Sender)
                .await?;
        }
        if to != &market.id {
            self.apply_leg(&market, meta, to, &tokens, &underlying, Leg::Receiver)
                .await?;
        }

        let record = HistoricalRecord {
            id: meta.event_id(),
            market: market.id.clone(),
            block_number: meta.block_number,
            block_time: meta.block_timestamp,
            body: RecordBody::Transfer {
                amount: units,
                from: from.clone(),
                to: to.clone(),
                market_symbol: market.symbol.clone(),
            },
        };
        self.repo.insert_record(&record).await?;
        Ok(Outcome::Applied)
    }

    async fn apply_leg(
        &self,
        market: &Market,
        meta: &EventMeta,
        account: &Address,
        tokens: &Decimal,
        underlying: &Decimal,
        leg: Leg,
    ) -> Result<(), StoreError> {
        let account_entity = self.repo.load_or_create_account(account).await?;
        self.repo.save_account(&account_entity);

        let mut position = self.touch_position(market, account, meta).await?;
        match leg {
            Leg::Sender => {
                position.token_balance = &position.token_balance - tokens;
                position.total_underlying_redeemed =
                    &position.total_underlying_redeemed + underlying;
            }
            Leg::Receiver => {
                position.token_balance = &position.token_balance + tokens;
                position.total_underlying_supplied =
                    &position.total_underlying_supplied + underlying;
            }
        }
        self.repo.save_position(&position);
        Ok(())
    }
}
