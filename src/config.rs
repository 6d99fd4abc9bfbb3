use crate::domain::Address;
use crate::engine::DEFAULT_BLOCKS_PER_YEAR;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub rpc_url: String,
    pub comptroller_address: Address,
    pub native_market_address: Option<Address>,
    pub native_market_name: String,
    pub native_market_symbol: String,
    pub invalid_markets: Vec<Address>,
    pub redeem_price_refresh_markets: Vec<Address>,
    pub blocks_per_year: u64,
    /// JSON-lines event file; stdin when unset.
    pub events_path: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let rpc_url = env_map
            .get("RPC_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("RPC_URL".to_string()))?;

        let comptroller_address = env_map
            .get("COMPTROLLER_ADDRESS")
            .ok_or_else(|| ConfigError::MissingEnv("COMPTROLLER_ADDRESS".to_string()))
            .and_then(|s| parse_address("COMPTROLLER_ADDRESS", s))?;

        let native_market_address = env_map
            .get("NATIVE_MARKET_ADDRESS")
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_address("NATIVE_MARKET_ADDRESS", s))
            .transpose()?;

        let native_market_name = env_map
            .get("NATIVE_MARKET_NAME")
            .cloned()
            .unwrap_or_else(|| "cEther".to_string());

        let native_market_symbol = env_map
            .get("NATIVE_MARKET_SYMBOL")
            .cloned()
            .unwrap_or_else(|| "cETH".to_string());

        let invalid_markets = parse_address_list(&env_map, "INVALID_MARKETS")?;
        let redeem_price_refresh_markets =
            parse_address_list(&env_map, "REDEEM_PRICE_REFRESH_MARKETS")?;

        let blocks_per_year = match env_map.get("BLOCKS_PER_YEAR") {
            Some(s) => s.parse::<u64>().map_err(|_| {
                ConfigError::InvalidValue(
                    "BLOCKS_PER_YEAR".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?,
            None => DEFAULT_BLOCKS_PER_YEAR,
        };

        let events_path = env_map
            .get("EVENTS_PATH")
            .filter(|s| !s.trim().is_empty())
            .cloned();

        Ok(Config {
            database_path,
            rpc_url,
            comptroller_address,
            native_market_address,
            native_market_name,
            native_market_symbol,
            invalid_markets,
            redeem_price_refresh_markets,
            blocks_per_year,
            events_path,
        })
    }
}

fn parse_address(key: &str, value: &str) -> Result<Address, ConfigError> {
    Address::parse(value.trim())
        .map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}

fn parse_address_list(
    env_map: &HashMap<String, String>,
    key: &str,
) -> Result<Vec<Address>, ConfigError> {
    match env_map.get(key) {
        Some(list) => list
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| parse_address(key, s))
            .collect(),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPTROLLER: &str = "0x3d9819210a31b4961b30ef54be2aed79b9c9cd3b";

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/test.db".to_string());
        map.insert("RPC_URL".to_string(), "http://localhost:8545".to_string());
        map.insert("COMPTROLLER_ADDRESS".to_string(), COMPTROLLER.to_string());
        map
    }

    #[test]
    fn test_missing_database_path() {
        let mut env_map = setup_required_env();
        env_map.remove("DATABASE_PATH");
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_missing_rpc_url() {
        let mut env_map = setup_required_env();
        env_map.remove("RPC_URL");
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "RPC_URL"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_missing_comptroller_address() {
        let mut env_map = setup_required_env();
        env_map.remove("COMPTROLLER_ADDRESS");
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "COMPTROLLER_ADDRESS"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.comptroller_address.as_str(), COMPTROLLER);
        assert!(config.native_market_address.is_none());
        assert_eq!(config.native_market_name, "cEther");
        assert_eq!(config.native_market_symbol, "cETH");
        assert!(config.invalid_markets.is_empty());
        assert!(config.redeem_price_refresh_markets.is_empty());
        assert_eq!(config.blocks_per_year, 2_336_000);
        assert!(config.events_path.is_none());
    }

    #[test]
    fn test_address_lists_are_trimmed_and_lowercased() {
        let mut env_map = setup_required_env();
        env_map.insert(
            "INVALID_MARKETS".to_string(),
            " 0xBB2B8038A1640196FBE3E38816F3E67CBA72D940 ,,0x0000000000000000000000000000000000000001"
                .to_string(),
        );
        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.invalid_markets.len(), 2);
        assert_eq!(
            config.invalid_markets[0].as_str(),
            "0xbb2b8038a1640196fbe3e38816f3e67cba72d940"
        );
    }

    #[test]
    fn test_invalid_address_rejected() {
        let mut env_map = setup_required_env();
        env_map.insert("NATIVE_MARKET_ADDRESS".to_string(), "0x123".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(key, _)) => assert_eq!(key, "NATIVE_MARKET_ADDRESS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_blocks_per_year() {
        let mut env_map = setup_required_env();
        env_map.insert("BLOCKS_PER_YEAR".to_string(), "many".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(key, _)) => assert_eq!(key, "BLOCKS_PER_YEAR"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
