//! Comptroller events: market membership, per-market risk and reward
//! parameters, and the protocol-config singleton.

use super::{unknown_market, Engine, Outcome};
use crate::db::StoreError;
use crate::domain::{Address, Decimal, EventMeta, ProtocolConfig, RawUint, MANTISSA_DECIMALS};

impl Engine {
    /// Load or create the protocol config, apply one field update, save.
    pub(super) async fn upsert_config(
        &self,
        update: impl FnOnce(&mut ProtocolConfig),
    ) -> Result<Outcome, StoreError> {
        let mut config = self.repo.load_or_create_protocol_config().await?;
        update(&mut config);
        self.repo.save_protocol_config(&config);
        Ok(Outcome::Applied)
    }

    pub(super) async fn handle_membership(
        &self,
        meta: &EventMeta,
        market: &Address,
        account: &Address,
        entered: bool,
    ) -> Result<Outcome, StoreError> {
        let Some(market) = self.repo.market(market).await? else {
            return Ok(unknown_market(market));
        };

        let account_entity = self.repo.load_or_create_account(account).await?;
        self.repo.save_account(&account_entity);

        let mut position = self.touch_position(&market, account, meta).await?;
        position.entered_market = entered;
        self.repo.save_position(&position);
        Ok(Outcome::Applied)
    }

    pub(super) async fn handle_collateral_factor(
        &self,
        market: &Address,
        mantissa: &RawUint,
    ) -> Result<Outcome, StoreError> {
        let Some(mut market) = self.repo.market(market).await? else {
            return Ok(unknown_market(market));
        };
        market.collateral_factor = Decimal::from_raw(mantissa, MANTISSA_DECIMALS);
        self.repo.save_market(&market);
        Ok(Outcome::Applied)
    }

    pub(super) async fn handle_comp_speed(
        &self,
        market: &Address,
        speed: &RawUint,
    ) -> Result<Outcome, StoreError> {
        let Some(mut market) = self.repo.market(market).await? else {
            return Ok(unknown_market(market));
        };
        market.comp_speed = Decimal::from_raw(speed, MANTISSA_DECIMALS);
        self.repo.save_market(&market);
        Ok(Outcome::Applied)
    }
}
