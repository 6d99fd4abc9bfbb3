//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use lendledger::datasource::{CallValue, ContractCall, RecordingRegistry};
use lendledger::domain::{Market, Position, PositionId};
use lendledger::{
    Address, Decimal, Engine, EngineSettings, Event, EventKind, EventMeta, ExternalReads,
    MemoryStore, MockChainReader, Outcome, RawUint, Repository, TxHash,
};
use std::str::FromStr;
use std::sync::Arc;

pub fn addr(n: u64) -> Address {
    Address::parse(&format!("0x{:040x}", n)).unwrap()
}

pub fn hash(n: u64) -> TxHash {
    TxHash::parse(&format!("0x{:064x}", n)).unwrap()
}

pub fn comptroller() -> Address {
    addr(0xc0)
}

pub fn oracle() -> Address {
    addr(0x0a)
}

pub fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

pub fn raw(s: &str) -> RawUint {
    RawUint::from_str(s).unwrap()
}

/// `amount * 10^decimals` as a raw integer.
pub fn units(amount: &str, decimals: u32) -> RawUint {
    let (whole, frac) = match amount.split_once('.') {
        Some((w, f)) => (w, f),
        None => (amount, ""),
    };
    assert!(frac.len() <= decimals as usize);
    let digits = format!(
        "{}{}{}",
        whole,
        frac,
        "0".repeat(decimals as usize - frac.len())
    );
    raw(&digits)
}

/// Event emitted by `address` in the transaction numbered `block`.
pub fn event(address: &Address, block: u64, log_index: u64, kind: EventKind) -> Event {
    Event {
        meta: EventMeta {
            address: address.clone(),
            tx_hash: hash(block),
            tx_index: 0,
            log_index,
            tx_log_index: log_index,
            block_number: block,
            block_timestamp: 1_600_000_000 + block * 13,
        },
        kind,
    }
}

pub struct Harness {
    pub engine: Engine,
    pub store: Arc<MemoryStore>,
    pub chain: Arc<MockChainReader>,
    pub registry: Arc<RecordingRegistry>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(EngineSettings::new(comptroller()))
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        let store = Arc::new(MemoryStore::new());
        let chain = Arc::new(MockChainReader::new());
        let registry = Arc::new(RecordingRegistry::new());
        let engine = Engine::new(
            Repository::new(store.clone()),
            ExternalReads::new(chain.clone()),
            registry.clone(),
            settings,
        );
        Self {
            engine,
            store,
            chain,
            registry,
        }
    }

    pub async fn process(&mut self, event: Event) -> Outcome {
        self.engine.process(&event).await.unwrap()
    }

    /// Mock the listing reads of a standard 8-decimal market.
    pub fn mock_market(
        &self,
        market: &Address,
        underlying: &Address,
        symbol: &str,
        underlying_decimals: u32,
    ) {
        self.chain.set(
            ContractCall::Underlying {
                market: market.clone(),
            },
            CallValue::Address(underlying.clone()),
        );
        self.chain.set(
            ContractCall::Symbol {
                token: market.clone(),
            },
            CallValue::Text(symbol.to_string()),
        );
        self.chain.set(
            ContractCall::Decimals {
                token: market.clone(),
            },
            CallValue::Uint(RawUint::from(8)),
        );
        self.chain.set(
            ContractCall::Symbol {
                token: underlying.clone(),
            },
            CallValue::Text(symbol.trim_start_matches('c').to_string()),
        );
        self.chain.set(
            ContractCall::Decimals {
                token: underlying.clone(),
            },
            CallValue::Uint(RawUint::from(u64::from(underlying_decimals))),
        );
    }

    pub async fn list_market(
        &mut self,
        market: &Address,
        underlying: &Address,
        symbol: &str,
        underlying_decimals: u32,
    ) {
        self.mock_market(market, underlying, symbol, underlying_decimals);
        let outcome = self
            .process(event(
                &comptroller(),
                1,
                0,
                EventKind::MarketListed {
                    market: market.clone(),
                },
            ))
            .await;
        assert_eq!(outcome, Outcome::Applied);
    }

    pub fn set_cash(&self, market: &Address, cash: RawUint) {
        self.chain.set(
            ContractCall::Cash {
                market: market.clone(),
            },
            CallValue::Uint(cash),
        );
    }

    pub fn set_price(&self, market: &Address, price: RawUint) {
        self.chain.set(
            ContractCall::UnderlyingPrice {
                oracle: oracle(),
                market: market.clone(),
            },
            CallValue::Uint(price),
        );
    }

    pub async fn market(&self, id: &Address) -> Market {
        self.engine.repo().market(id).await.unwrap().unwrap()
    }

    pub async fn position(&self, market: &Address, account: &Address) -> Option<Position> {
        self.engine
            .repo()
            .position(&PositionId::new(market.clone(), account.clone()))
            .await
            .unwrap()
    }
}
