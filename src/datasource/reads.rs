//! Value-or-default wrapper over a [`ChainReader`].

use super::{CallValue, ChainReader, ContractCall, ReadError};
use crate::domain::{Address, Decimal, RawUint, ORACLE_DECIMALS};
use bigdecimal::ToPrimitive;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of a best-effort read.
///
/// `Defaulted` carries the substitute value used because the read failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Read<T> {
    Value(T),
    Defaulted(T),
}

impl<T> Read<T> {
    /// The value, whether read or substituted.
    pub fn value(self) -> T {
        match self {
            Read::Value(v) | Read::Defaulted(v) => v,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        matches!(self, Read::Defaulted(_))
    }

    /// The value only if the read succeeded.
    pub fn ok(self) -> Option<T> {
        match self {
            Read::Value(v) => Some(v),
            Read::Defaulted(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Read<U> {
        match self {
            Read::Value(v) => Read::Value(f(v)),
            Read::Defaulted(v) => Read::Defaulted(f(v)),
        }
    }
}

/// Typed reads with default substitution: zero for numbers, the zero
/// address for addresses, an empty string for text.
#[derive(Debug, Clone)]
pub struct ExternalReads {
    reader: Arc<dyn ChainReader>,
}

impl ExternalReads {
    pub fn new(reader: Arc<dyn ChainReader>) -> Self {
        Self { reader }
    }

    fn fallback<T>(&self, call: &ContractCall, error: &ReadError, default: T) -> Read<T> {
        match call {
            ContractCall::Cash { .. } | ContractCall::UnderlyingPrice { .. } => {
                warn!(call = %call, error = %error, "Contract read failed, using default")
            }
            _ => debug!(call = %call, error = %error, "Contract read failed, using default"),
        }
        Read::Defaulted(default)
    }

    async fn read_uint(&self, call: ContractCall, block_number: u64) -> Read<RawUint> {
        match self.reader.call(&call, block_number).await {
            Ok(CallValue::Uint(v)) => Read::Value(v),
            Ok(other) => self.fallback(
                &call,
                &ReadError::Decode(format!("expected uint, got {:?}", other)),
                RawUint::zero(),
            ),
            Err(e) => self.fallback(&call, &e, RawUint::zero()),
        }
    }

    async fn read_address(&self, call: ContractCall, block_number: u64) -> Read<Address> {
        match self.reader.call(&call, block_number).await {
            Ok(CallValue::Address(v)) => Read::Value(v),
            Ok(other) => self.fallback(
                &call,
                &ReadError::Decode(format!("expected address, got {:?}", other)),
                Address::zero(),
            ),
            Err(e) => self.fallback(&call, &e, Address::zero()),
        }
    }

    async fn read_text(&self, call: ContractCall, block_number: u64) -> Read<String> {
        match self.reader.call(&call, block_number).await {
            Ok(CallValue::Text(v)) => Read::Value(v),
            Ok(other) => self.fallback(
                &call,
                &ReadError::Decode(format!("expected text, got {:?}", other)),
                String::new(),
            ),
            Err(e) => self.fallback(&call, &e, String::new()),
        }
    }

    pub async fn underlying(&self, market: &Address, block_number: u64) -> Read<Address> {
        self.read_address(
            ContractCall::Underlying {
                market: market.clone(),
            },
            block_number,
        )
        .await
    }

    pub async fn symbol(&self, token: &Address, block_number: u64) -> Read<String> {
        self.read_text(
            ContractCall::Symbol {
                token: token.clone(),
            },
            block_number,
        )
        .await
    }

    pub async fn name(&self, token: &Address, block_number: u64) -> Read<String> {
        self.read_text(
            ContractCall::Name {
                token: token.clone(),
            },
            block_number,
        )
        .await
    }

    pub async fn decimals(&self, token: &Address, block_number: u64) -> Read<u32> {
        let call = ContractCall::Decimals {
            token: token.clone(),
        };
        match self.read_uint(call.clone(), block_number).await {
            Read::Value(raw) => match raw.as_bigint().to_u32() {
                Some(decimals) => Read::Value(decimals),
                None => self.fallback(
                    &call,
                    &ReadError::Decode(format!("decimals out of range: {}", raw)),
                    0,
                ),
            },
            Read::Defaulted(_) => Read::Defaulted(0),
        }
    }

    /// Live underlying balance held by the market, raw.
    pub async fn cash(&self, market: &Address, block_number: u64) -> Read<RawUint> {
        self.read_uint(
            ContractCall::Cash {
                market: market.clone(),
            },
            block_number,
        )
        .await
    }

    pub async fn borrow_rate_per_block(&self, market: &Address, block_number: u64) -> Read<RawUint> {
        self.read_uint(
            ContractCall::BorrowRatePerBlock {
                market: market.clone(),
            },
            block_number,
        )
        .await
    }

    pub async fn supply_rate_per_block(&self, market: &Address, block_number: u64) -> Read<RawUint> {
        self.read_uint(
            ContractCall::SupplyRatePerBlock {
                market: market.clone(),
            },
            block_number,
        )
        .await
    }

    pub async fn interest_rate_model(&self, market: &Address, block_number: u64) -> Read<Address> {
        self.read_address(
            ContractCall::InterestRateModel {
                market: market.clone(),
            },
            block_number,
        )
        .await
    }

    pub async fn reserve_factor(&self, market: &Address, block_number: u64) -> Read<RawUint> {
        self.read_uint(
            ContractCall::ReserveFactor {
                market: market.clone(),
            },
            block_number,
        )
        .await
    }

    pub async fn reward_per_block(&self, market: &Address, block_number: u64) -> Read<RawUint> {
        self.read_uint(
            ContractCall::RewardPerBlock {
                market: market.clone(),
            },
            block_number,
        )
        .await
    }

    pub async fn comp_speed(
        &self,
        comptroller: &Address,
        market: &Address,
        block_number: u64,
    ) -> Read<RawUint> {
        self.read_uint(
            ContractCall::CompSpeed {
                comptroller: comptroller.clone(),
                market: market.clone(),
            },
            block_number,
        )
        .await
    }

    /// Oracle price of one underlying unit.
    ///
    /// The oracle scales prices to 36 decimals minus the underlying's own
    /// decimals, so the raw value is divided by `10^(18 - d + 18)`.
    pub async fn underlying_price(
        &self,
        oracle: Option<&Address>,
        market: &Address,
        underlying_decimals: u32,
        block_number: u64,
    ) -> Read<Decimal> {
        let oracle = match oracle {
            Some(oracle) if !oracle.is_zero() => oracle,
            _ => {
                debug!(market = %market, "No price oracle configured, using zero price");
                return Read::Defaulted(Decimal::zero());
            }
        };

        let exponent = ORACLE_DECIMALS.saturating_sub(underlying_decimals);
        self.read_uint(
            ContractCall::UnderlyingPrice {
                oracle: oracle.clone(),
                market: market.clone(),
            },
            block_number,
        )
        .await
        .map(|raw| Decimal::from_raw(&raw, exponent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockChainReader;
    use std::str::FromStr;

    fn addr(last: char) -> Address {
        Address::parse(&format!("0x{}{}", "0".repeat(39), last)).unwrap()
    }

    #[tokio::test]
    async fn test_failed_reads_use_defaults() {
        let reads = ExternalReads::new(Arc::new(MockChainReader::new()));

        let cash = reads.cash(&addr('1'), 10).await;
        assert_eq!(cash, Read::Defaulted(RawUint::zero()));

        let model = reads.interest_rate_model(&addr('1'), 10).await;
        assert!(model.is_defaulted());
        assert!(model.value().is_zero());

        let symbol = reads.symbol(&addr('1'), 10).await;
        assert_eq!(symbol, Read::Defaulted(String::new()));

        assert_eq!(reads.decimals(&addr('1'), 10).await, Read::Defaulted(0));
    }

    #[tokio::test]
    async fn test_successful_reads_pass_through() {
        let mock = MockChainReader::new()
            .with_uint(ContractCall::Decimals { token: addr('2') }, RawUint::from(6))
            .with_text(ContractCall::Symbol { token: addr('2') }, "USDC");
        let reads = ExternalReads::new(Arc::new(mock));

        assert_eq!(reads.decimals(&addr('2'), 1).await, Read::Value(6));
        assert_eq!(reads.symbol(&addr('2'), 1).await.ok(), Some("USDC".to_string()));
    }

    #[tokio::test]
    async fn test_type_mismatch_is_a_failed_read() {
        let mock = MockChainReader::new()
            .with_text(ContractCall::Cash { market: addr('1') }, "not a number");
        let reads = ExternalReads::new(Arc::new(mock));
        assert!(reads.cash(&addr('1'), 1).await.is_defaulted());
    }

    #[tokio::test]
    async fn test_oracle_price_normalizes_by_underlying_decimals() {
        let oracle = addr('9');
        let usdc_market = addr('3');
        // 1.00 USDC at 6 decimals is reported as 1e30.
        let mock = MockChainReader::new().with_uint(
            ContractCall::UnderlyingPrice {
                oracle: oracle.clone(),
                market: usdc_market.clone(),
            },
            RawUint::from_str(&format!("1{}", "0".repeat(30))).unwrap(),
        );
        let reads = ExternalReads::new(Arc::new(mock));

        let price = reads.underlying_price(Some(&oracle), &usdc_market, 6, 1).await;
        assert_eq!(price, Read::Value(Decimal::one()));
    }

    #[tokio::test]
    async fn test_oracle_price_without_oracle_is_zero() {
        let reads = ExternalReads::new(Arc::new(MockChainReader::new()));
        let price = reads.underlying_price(None, &addr('3'), 18, 1).await;
        assert_eq!(price, Read::Defaulted(Decimal::zero()));

        let zero_oracle = Address::zero();
        let price = reads.underlying_price(Some(&zero_oracle), &addr('3'), 18, 1).await;
        assert!(price.is_defaulted());
    }

    #[test]
    fn test_read_map_keeps_tag() {
        let read: Read<u32> = Read::Defaulted(0);
        assert_eq!(read.map(|v| v + 1), Read::Defaulted(1));
        assert_eq!(Read::Value(2).map(|v: u32| v * 2).ok(), Some(4));
    }
}
