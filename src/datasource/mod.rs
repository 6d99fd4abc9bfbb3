//! Best-effort reads from market, token, comptroller and oracle contracts.

use crate::domain::{Address, RawUint};
use async_trait::async_trait;
use std::fmt;

pub mod mock;
pub mod reads;
pub mod registry;
pub mod rpc;

pub use mock::MockChainReader;
pub use reads::{ExternalReads, Read};
pub use registry::{DataSourceRegistry, LoggingRegistry, RecordingRegistry};
pub use rpc::RpcChainReader;

/// Every contract view the engine may call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ContractCall {
    /// `underlying()` on a market.
    Underlying { market: Address },
    /// `symbol()` on a market or ERC-20 token.
    Symbol { token: Address },
    /// `name()` on a market or ERC-20 token.
    Name { token: Address },
    /// `decimals()` on a market or ERC-20 token.
    Decimals { token: Address },
    /// `getCash()`: the market's live underlying balance.
    Cash { market: Address },
    BorrowRatePerBlock { market: Address },
    SupplyRatePerBlock { market: Address },
    InterestRateModel { market: Address },
    ReserveFactor { market: Address },
    RewardPerBlock { market: Address },
    /// `compSpeeds(market)` on the comptroller.
    CompSpeed { comptroller: Address, market: Address },
    /// `getUnderlyingPrice(market)` on the price oracle.
    UnderlyingPrice { oracle: Address, market: Address },
}

/// Shape of the value a call returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Address,
    Uint,
    Text,
}

impl ContractCall {
    /// Contract the call is sent to.
    pub fn target(&self) -> &Address {
        match self {
            ContractCall::Underlying { market }
            | ContractCall::Cash { market }
            | ContractCall::BorrowRatePerBlock { market }
            | ContractCall::SupplyRatePerBlock { market }
            | ContractCall::InterestRateModel { market }
            | ContractCall::ReserveFactor { market }
            | ContractCall::RewardPerBlock { market } => market,
            ContractCall::Symbol { token }
            | ContractCall::Name { token }
            | ContractCall::Decimals { token } => token,
            ContractCall::CompSpeed { comptroller, .. } => comptroller,
            ContractCall::UnderlyingPrice { oracle, .. } => oracle,
        }
    }

    /// Solidity signature, the preimage of the 4-byte selector.
    pub fn signature(&self) -> &'static str {
        match self {
            ContractCall::Underlying { .. } => "underlying()",
            ContractCall::Symbol { .. } => "symbol()",
            ContractCall::Name { .. } => "name()",
            ContractCall::Decimals { .. } => "decimals()",
            ContractCall::Cash { .. } => "getCash()",
            ContractCall::BorrowRatePerBlock { .. } => "borrowRatePerBlock()",
            ContractCall::SupplyRatePerBlock { .. } => "supplyRatePerBlock()",
            ContractCall::InterestRateModel { .. } => "interestRateModel()",
            ContractCall::ReserveFactor { .. } => "reserveFactorMantissa()",
            ContractCall::RewardPerBlock { .. } => "rewardPerBlock()",
            ContractCall::CompSpeed { .. } => "compSpeeds(address)",
            ContractCall::UnderlyingPrice { .. } => "getUnderlyingPrice(address)",
        }
    }

    /// Single address argument, if the call takes one.
    pub fn argument(&self) -> Option<&Address> {
        match self {
            ContractCall::CompSpeed { market, .. } | ContractCall::UnderlyingPrice { market, .. } => {
                Some(market)
            }
            _ => None,
        }
    }

    pub fn output(&self) -> OutputKind {
        match self {
            ContractCall::Underlying { .. } | ContractCall::InterestRateModel { .. } => {
                OutputKind::Address
            }
            ContractCall::Symbol { .. } | ContractCall::Name { .. } => OutputKind::Text,
            _ => OutputKind::Uint,
        }
    }
}

impl fmt::Display for ContractCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.argument() {
            Some(arg) => write!(
                f,
                "{}.{}",
                self.target(),
                self.signature().replace("address", arg.as_str())
            ),
            None => write!(f, "{}.{}", self.target(), self.signature()),
        }
    }
}

/// Decoded return value of a contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallValue {
    Address(Address),
    Uint(RawUint),
    Text(String),
}

/// Chain reader trait: executes one view call at a given block.
///
/// Implementations report failures; substituting defaults is the job of
/// [`ExternalReads`].
#[async_trait]
pub trait ChainReader: Send + Sync + fmt::Debug {
    async fn call(&self, call: &ContractCall, block_number: u64) -> Result<CallValue, ReadError>;
}

/// Error type for contract reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// The call reverted or the target has no code.
    Reverted(String),
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// JSON-RPC error object other than a revert
    Rpc { code: i64, message: String },
    /// Return data could not be decoded as the expected type
    Decode(String),
    /// Rate limit exceeded
    RateLimited,
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::Reverted(msg) => write!(f, "Call reverted: {}", msg),
            ReadError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            ReadError::Rpc { code, message } => write!(f, "RPC error {}: {}", code, message),
            ReadError::Decode(msg) => write!(f, "Decode error: {}", msg),
            ReadError::RateLimited => write!(f, "Rate limited"),
        }
    }
}

impl std::error::Error for ReadError {}
