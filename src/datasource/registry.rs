//! Host capability for starting event delivery from newly listed markets.

use crate::domain::Address;
use std::fmt;
use std::sync::Mutex;
use tracing::info;

/// Requests that the host deliver events emitted by `address` from now on.
///
/// The engine only calls this; the host implements delivery.
pub trait DataSourceRegistry: Send + Sync + fmt::Debug {
    fn subscribe(&self, address: &Address);
}

/// Registry for hosts that already deliver every market's events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingRegistry;

impl DataSourceRegistry for LoggingRegistry {
    fn subscribe(&self, address: &Address) {
        info!(market = %address, "Subscribing to market events");
    }
}

/// Registry that remembers every subscription.
#[derive(Debug, Default)]
pub struct RecordingRegistry {
    subscribed: Mutex<Vec<Address>>,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribed(&self) -> Vec<Address> {
        self.subscribed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl DataSourceRegistry for RecordingRegistry {
    fn subscribe(&self, address: &Address) {
        self.subscribed
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(address.clone());
    }
}
