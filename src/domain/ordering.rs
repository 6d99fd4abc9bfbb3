//! Stable event ordering.

use crate::domain::Event;

/// Ordering key for events: block number -> transaction index -> log index.
///
/// The host guarantees delivery in this order; the engine only observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventOrderingKey {
    pub block_number: u64,
    pub tx_index: u64,
    pub log_index: u64,
}

impl EventOrderingKey {
    pub fn from_event(event: &Event) -> Self {
        EventOrderingKey {
            block_number: event.meta.block_number,
            tx_index: event.meta.tx_index,
            log_index: event.meta.log_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, EventKind, EventMeta, TxHash};

    fn make_event(block_number: u64, tx_index: u64, log_index: u64) -> Event {
        let address = Address::parse("0x697b4acaa24430f254224eb794d2a85ba1fa1fb8").unwrap();
        Event {
            meta: EventMeta {
                address: address.clone(),
                tx_hash: TxHash::parse(&format!("0x{}", "1".repeat(64))).unwrap(),
                tx_index,
                log_index,
                tx_log_index: log_index,
                block_number,
                block_timestamp: 1_600_000_000,
            },
            kind: EventKind::NewPriceOracle {
                new_price_oracle: address,
            },
        }
    }

    fn key(block_number: u64, tx_index: u64, log_index: u64) -> EventOrderingKey {
        EventOrderingKey::from_event(&make_event(block_number, tx_index, log_index))
    }

    #[test]
    fn test_event_ordering_by_block() {
        assert!(key(10, 5, 5) < key(11, 0, 0));
        assert!(key(11, 0, 0) > key(10, 5, 5));
    }

    #[test]
    fn test_event_ordering_same_block_by_tx_then_log() {
        assert!(key(10, 1, 9) < key(10, 2, 0));
        assert!(key(10, 2, 0) < key(10, 2, 1));
        assert_eq!(key(10, 2, 1), key(10, 2, 1));
    }
}
