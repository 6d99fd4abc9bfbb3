//! JSON-RPC `eth_call` reader.

use super::{CallValue, ChainReader, ContractCall, OutputKind, ReadError};
use crate::domain::{Address, RawUint};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use sha3::{Digest, Keccak256};
use std::time::Duration;
use tracing::debug;

const WORD: usize = 32;

/// Chain reader backed by an Ethereum JSON-RPC endpoint.
#[derive(Debug, Clone)]
pub struct RpcChainReader {
    client: Client,
    url: String,
}

impl RpcChainReader {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }

    async fn eth_call(
        &self,
        to: &Address,
        data: &str,
        block_number: u64,
    ) -> Result<Vec<u8>, ReadError> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                { "to": to.as_str(), "data": data },
                format!("0x{:x}", block_number)
            ]
        });
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        let response = retry(backoff, || async {
            let response = self
                .client
                .post(&self.url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| backoff::Error::transient(ReadError::NetworkError(e.to_string())))?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(ReadError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(ReadError::NetworkError(format!(
                    "HTTP {}",
                    status.as_u16()
                ))));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(ReadError::NetworkError(format!(
                    "HTTP {}",
                    status.as_u16()
                ))));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(ReadError::Decode(e.to_string())))
        })
        .await?;

        parse_rpc_result(&response)
    }
}

#[async_trait]
impl ChainReader for RpcChainReader {
    async fn call(&self, call: &ContractCall, block_number: u64) -> Result<CallValue, ReadError> {
        debug!(call = %call, block_number, "eth_call");
        let data = encode_call(call);
        let output = self.eth_call(call.target(), &data, block_number).await?;
        decode_output(call.output(), &output)
    }
}

/// First four bytes of the Keccak-256 hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// ABI-encode the call as `0x`-prefixed calldata.
pub fn encode_call(call: &ContractCall) -> String {
    let mut data = selector(call.signature()).to_vec();
    if let Some(arg) = call.argument() {
        let mut word = [0u8; WORD];
        // Address is validated hex, so decoding cannot fail.
        if let Ok(bytes) = hex::decode(&arg.as_str()[2..]) {
            word[WORD - bytes.len()..].copy_from_slice(&bytes);
        }
        data.extend_from_slice(&word);
    }
    format!("0x{}", hex::encode(data))
}

fn parse_rpc_result(response: &serde_json::Value) -> Result<Vec<u8>, ReadError> {
    if let Some(error) = response.get("error") {
        let code = error.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("")
            .to_string();
        if code == 3 || message.contains("revert") {
            return Err(ReadError::Reverted(message));
        }
        return Err(ReadError::Rpc { code, message });
    }

    let result = response
        .get("result")
        .and_then(|r| r.as_str())
        .ok_or_else(|| ReadError::Decode("missing result".to_string()))?;
    let hex_data = result.strip_prefix("0x").unwrap_or(result);
    hex::decode(hex_data).map_err(|e| ReadError::Decode(e.to_string()))
}

/// Decode ABI return data.
///
/// Empty return data means the target reverted without reason or has no code.
pub fn decode_output(kind: OutputKind, data: &[u8]) -> Result<CallValue, ReadError> {
    if data.is_empty() {
        return Err(ReadError::Reverted("empty return data".to_string()));
    }
    if data.len() < WORD {
        return Err(ReadError::Decode(format!(
            "return data too short: {} bytes",
            data.len()
        )));
    }

    match kind {
        OutputKind::Uint => Ok(CallValue::Uint(RawUint::from_be_bytes(&data[..WORD]))),
        OutputKind::Address => {
            let addr = format!("0x{}", hex::encode(&data[WORD - 20..WORD]));
            Address::parse(&addr)
                .map(CallValue::Address)
                .map_err(|e| ReadError::Decode(e.to_string()))
        }
        OutputKind::Text => decode_text(data).map(CallValue::Text),
    }
}

fn word_to_usize(word: &[u8]) -> Result<usize, ReadError> {
    if word[..WORD - 8].iter().any(|b| *b != 0) {
        return Err(ReadError::Decode("offset out of range".to_string()));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&word[WORD - 8..WORD]);
    usize::try_from(u64::from_be_bytes(buf))
        .map_err(|_| ReadError::Decode("offset out of range".to_string()))
}

fn decode_text(data: &[u8]) -> Result<String, ReadError> {
    // Some legacy tokens return a bytes32 instead of a dynamic string.
    if data.len() == WORD {
        let end = data.iter().position(|b| *b == 0).unwrap_or(WORD);
        return Ok(String::from_utf8_lossy(&data[..end]).into_owned());
    }

    let offset = word_to_usize(&data[..WORD])?;
    let len_end = offset
        .checked_add(WORD)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| ReadError::Decode("string offset past end".to_string()))?;
    let len = word_to_usize(&data[offset..len_end])?;
    let bytes_end = len_end
        .checked_add(len)
        .filter(|end| *end <= data.len())
        .ok_or_else(|| ReadError::Decode("string length past end".to_string()))?;
    Ok(String::from_utf8_lossy(&data[len_end..bytes_end]).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::parse(s).unwrap()
    }

    fn encode_string(s: &str) -> Vec<u8> {
        let mut data = vec![0u8; WORD];
        data[WORD - 1] = 0x20;
        let mut len = vec![0u8; WORD];
        len[WORD - 1] = s.len() as u8;
        data.extend(len);
        let mut body = s.as_bytes().to_vec();
        body.resize(WORD, 0);
        data.extend(body);
        data
    }

    #[test]
    fn test_selectors_match_known_values() {
        assert_eq!(hex::encode(selector("decimals()")), "313ce567");
        assert_eq!(hex::encode(selector("symbol()")), "95d89b41");
        assert_eq!(hex::encode(selector("name()")), "06fdde03");
    }

    #[test]
    fn test_encode_call_with_address_argument() {
        let market = addr("0x5d3a536e4d6dbd6114cc1ead35777bab948e3643");
        let call = ContractCall::UnderlyingPrice {
            oracle: addr("0x0000000000000000000000000000000000000009"),
            market,
        };
        let data = encode_call(&call);
        assert_eq!(data.len(), 2 + 8 + 64);
        assert!(data.ends_with("5d3a536e4d6dbd6114cc1ead35777bab948e3643"));
        assert!(data[10..34].chars().all(|c| c == '0'));
    }

    #[test]
    fn test_encode_call_without_argument() {
        let call = ContractCall::Decimals {
            token: addr("0x0000000000000000000000000000000000000001"),
        };
        assert_eq!(encode_call(&call), "0x313ce567");
    }

    #[test]
    fn test_decode_uint_and_address() {
        let mut word = vec![0u8; WORD];
        word[WORD - 1] = 18;
        assert_eq!(
            decode_output(OutputKind::Uint, &word).unwrap(),
            CallValue::Uint(RawUint::from(18))
        );

        let mut word = vec![0u8; WORD];
        word[WORD - 20..].copy_from_slice(&[0xab; 20]);
        assert_eq!(
            decode_output(OutputKind::Address, &word).unwrap(),
            CallValue::Address(addr(&format!("0x{}", "ab".repeat(20))))
        );
    }

    #[test]
    fn test_decode_dynamic_and_bytes32_strings() {
        assert_eq!(
            decode_output(OutputKind::Text, &encode_string("Dai Stablecoin")).unwrap(),
            CallValue::Text("Dai Stablecoin".to_string())
        );

        let mut bytes32 = b"MKR".to_vec();
        bytes32.resize(WORD, 0);
        assert_eq!(
            decode_output(OutputKind::Text, &bytes32).unwrap(),
            CallValue::Text("MKR".to_string())
        );
    }

    #[test]
    fn test_decode_empty_is_revert_and_short_is_decode_error() {
        assert!(matches!(
            decode_output(OutputKind::Uint, &[]),
            Err(ReadError::Reverted(_))
        ));
        assert!(matches!(
            decode_output(OutputKind::Uint, &[1, 2, 3]),
            Err(ReadError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_text_rejects_bad_offset() {
        let mut data = vec![0u8; WORD * 2];
        data[WORD - 1] = 0xff;
        assert!(matches!(
            decode_output(OutputKind::Text, &data),
            Err(ReadError::Decode(_))
        ));
    }

    #[test]
    fn test_parse_rpc_result_variants() {
        let ok = serde_json::json!({"jsonrpc": "2.0", "id": 1, "result": "0x0102"});
        assert_eq!(parse_rpc_result(&ok).unwrap(), vec![1, 2]);

        let reverted = serde_json::json!({"error": {"code": 3, "message": "execution reverted"}});
        assert!(matches!(
            parse_rpc_result(&reverted),
            Err(ReadError::Reverted(_))
        ));

        let other = serde_json::json!({"error": {"code": -32602, "message": "invalid params"}});
        assert_eq!(
            parse_rpc_result(&other),
            Err(ReadError::Rpc {
                code: -32602,
                message: "invalid params".to_string()
            })
        );
    }
}
