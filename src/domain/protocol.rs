//! Protocol-wide parameters (the comptroller singleton).

use serde::{Deserialize, Serialize};

use super::keys::PROTOCOL_CONFIG_ID;
use super::primitives::{Address, RawUint};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub id: String,
    /// Raw 18-decimal mantissa as reported by the comptroller.
    pub close_factor_mantissa: Option<RawUint>,
    /// Raw 18-decimal mantissa as reported by the comptroller.
    pub liquidation_incentive_mantissa: Option<RawUint>,
    pub price_oracle: Option<Address>,
}

impl ProtocolConfig {
    pub fn new() -> Self {
        Self {
            id: PROTOCOL_CONFIG_ID.to_string(),
            close_factor_mantissa: None,
            liquidation_incentive_mantissa: None,
            price_oracle: None,
        }
    }
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self::new()
    }
}
