//! Mock chain reader for testing without network calls.

use super::{CallValue, ChainReader, ContractCall, ReadError};
use crate::domain::{Address, RawUint};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// Mock chain reader that returns canned responses; unknown calls revert.
///
/// Responses can be replaced between events with [`MockChainReader::set`].
#[derive(Debug, Default)]
pub struct MockChainReader {
    responses: Mutex<HashMap<ContractCall, CallValue>>,
}

impl MockChainReader {
    /// Create a mock where every call reverts.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, call: ContractCall, value: CallValue) -> Self {
        self.set(call, value);
        self
    }

    pub fn with_uint(self, call: ContractCall, value: RawUint) -> Self {
        self.with_response(call, CallValue::Uint(value))
    }

    pub fn with_address(self, call: ContractCall, value: Address) -> Self {
        self.with_response(call, CallValue::Address(value))
    }

    pub fn with_text(self, call: ContractCall, value: &str) -> Self {
        self.with_response(call, CallValue::Text(value.to_string()))
    }

    /// Replace the response for a call.
    pub fn set(&self, call: ContractCall, value: CallValue) {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(call, value);
    }

    /// Make a call revert from now on.
    pub fn revert(&self, call: &ContractCall) {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(call);
    }
}

#[async_trait]
impl ChainReader for MockChainReader {
    async fn call(&self, call: &ContractCall, _block_number: u64) -> Result<CallValue, ReadError> {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(call)
            .cloned()
            .ok_or_else(|| ReadError::Reverted(format!("no mock response for {}", call)))
    }
}
