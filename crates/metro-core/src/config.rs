//! Layered configuration for the auction and the bridge
//!
//! Values come from built-in defaults, then an optional TOML file, then
//! `METRO_*` environment variables (`METRO_AUCTION_TIME_SCALE=1` sets
//! `auction.time_scale`). [`MetroConfig::validate`] runs last.
//!
//! Supplies are written in whole tokens and prices in base fund units per
//! whole token, so every value fits a TOML integer.

use crate::types::{Amount, ChainId, ChainTable};
use crate::{MetroError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "METRO_";

/// Auction schedule and supply parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuctionConfig {
    /// Price floor, in fund base units per whole token
    pub minimum_price: u64,
    /// Opening price of the initial auction, in fund base units per whole token
    pub starting_price: u64,
    /// Seconds per auction tick
    pub time_scale: u64,
    /// Length of the initial auction in days
    pub initial_auction_days: u64,
    /// Decimal places of the token; one whole token is `10^token_decimals` units
    pub token_decimals: u32,
    /// Whole tokens offered by the initial auction
    pub initial_auction_supply: u64,
    /// Whole tokens offered by each daily auction
    pub daily_supply: u64,
    /// Hard cap on whole tokens ever issued, founder allocations included
    pub supply_cap: u64,
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            minimum_price: 3_300_000_000_000,
            starting_price: 2_000_000_000_000_000_000,
            time_scale: 60,
            initial_auction_days: 7,
            token_decimals: 18,
            initial_auction_supply: 8_000_000,
            daily_supply: 2_880,
            supply_cap: 10_000_000,
        }
    }
}

impl AuctionConfig {
    /// Base units in one whole token
    pub fn token_unit(&self) -> Result<Amount> {
        10u128
            .checked_pow(self.token_decimals)
            .ok_or_else(|| MetroError::overflow("token decimals"))
    }

    /// Convert whole tokens to base units
    pub fn to_units(&self, whole_tokens: u64) -> Result<Amount> {
        Amount::from(whole_tokens)
            .checked_mul(self.token_unit()?)
            .ok_or_else(|| MetroError::overflow("whole token conversion"))
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.time_scale == 0 {
            return Err(MetroError::config("auction.time_scale must be positive"));
        }
        if self.minimum_price == 0 {
            return Err(MetroError::config("auction.minimum_price must be positive"));
        }
        if self.starting_price < self.minimum_price {
            return Err(MetroError::config(
                "auction.starting_price must not be below auction.minimum_price",
            ));
        }
        if self.initial_auction_days == 0 {
            return Err(MetroError::config(
                "auction.initial_auction_days must be positive",
            ));
        }
        if self.initial_auction_supply > self.supply_cap {
            return Err(MetroError::config(
                "auction.initial_auction_supply exceeds auction.supply_cap",
            ));
        }
        self.to_units(self.supply_cap)
            .map_err(|_| MetroError::config("auction.supply_cap overflows base units"))?;
        Ok(())
    }
}

/// Cross-ledger bridge parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Name of the ledger this node runs on
    pub local_chain: String,
    /// All bridged ledgers, in supply-slot order
    pub chains: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            local_chain: "ETH".to_string(),
            chains: vec!["ETH".to_string(), "ETC".to_string(), "QTUM".to_string()],
        }
    }
}

impl BridgeConfig {
    /// Parsed local chain id
    pub fn local_chain_id(&self) -> Result<ChainId> {
        ChainId::new(&self.local_chain)
    }

    /// Parsed, validated chain table
    pub fn chain_table(&self) -> Result<ChainTable> {
        ChainTable::from_names(&self.chains)
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        let local = self
            .local_chain_id()
            .map_err(|e| MetroError::config(format!("bridge.local_chain: {e}")))?;
        let table = self
            .chain_table()
            .map_err(|e| MetroError::config(format!("bridge.chains: {e}")))?;
        if !table.contains(local) {
            return Err(MetroError::config(format!(
                "bridge.local_chain {local} is not listed in bridge.chains"
            )));
        }
        Ok(())
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetroConfig {
    /// Auction parameters
    pub auction: AuctionConfig,
    /// Bridge parameters
    pub bridge: BridgeConfig,
}

impl MetroConfig {
    /// Defaults, then optional file, then environment, then validation
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::default(),
        };
        config.merge_with_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file; missing keys keep their defaults
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            MetroError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `METRO_*` variables from the process environment
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Apply `METRO_*` overrides from an explicit variable list
    pub fn merge_with_vars<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let Some(rest) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let dotted = match rest.to_ascii_lowercase().split_once('_') {
                Some((section @ ("auction" | "bridge"), field)) => format!("{section}.{field}"),
                _ => {
                    tracing::debug!(key = key.as_ref(), "ignoring unrelated environment variable");
                    continue;
                }
            };
            tracing::debug!(key = %dotted, "applying environment override");
            self.set_from_string(&dotted, value.as_ref())?;
        }
        Ok(())
    }

    /// Set one value by dotted key (`auction.time_scale`)
    pub fn set_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            "auction.minimum_price" => self.auction.minimum_price = parse_num(key, value)?,
            "auction.starting_price" => self.auction.starting_price = parse_num(key, value)?,
            "auction.time_scale" => self.auction.time_scale = parse_num(key, value)?,
            "auction.initial_auction_days" => {
                self.auction.initial_auction_days = parse_num(key, value)?;
            }
            "auction.token_decimals" => self.auction.token_decimals = parse_num(key, value)?,
            "auction.initial_auction_supply" => {
                self.auction.initial_auction_supply = parse_num(key, value)?;
            }
            "auction.daily_supply" => self.auction.daily_supply = parse_num(key, value)?,
            "auction.supply_cap" => self.auction.supply_cap = parse_num(key, value)?,
            "bridge.local_chain" => self.bridge.local_chain = value.to_string(),
            "bridge.chains" => {
                self.bridge.chains = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            _ => return Err(MetroError::config(format!("Unknown config key: {key}"))),
        }
        Ok(())
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.auction.validate()?;
        self.bridge.validate()
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| MetroError::config(format!("{key}: invalid number {value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_validate() {
        let config = MetroConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.auction.initial_auction_days, 7);
        assert_eq!(config.auction.token_unit().unwrap(), 10u128.pow(18));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = MetroConfig::from_toml_str(
            r#"
            [auction]
            time_scale = 1
            minimum_price = 1000

            [bridge]
            local_chain = "ETC"
            chains = ["ETC", "ETH"]
            "#,
        )
        .unwrap();
        assert_eq!(config.auction.time_scale, 1);
        assert_eq!(config.auction.minimum_price, 1000);
        assert_eq!(config.auction.daily_supply, 2_880);
        assert_eq!(config.bridge.local_chain, "ETC");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = MetroConfig::from_toml_str("[auction]\nspeed = 3\n").unwrap_err();
        assert!(matches!(err, MetroError::Config { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[auction]\ndaily_supply = 100").unwrap();
        let config = MetroConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.auction.daily_supply, 100);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = MetroConfig::default();
        config
            .merge_with_vars([
                ("METRO_AUCTION_TIME_SCALE", "1"),
                ("METRO_BRIDGE_CHAINS", "ETH, ETC"),
                ("HOME", "/root"),
            ])
            .unwrap();
        assert_eq!(config.auction.time_scale, 1);
        assert_eq!(config.bridge.chains, vec!["ETH", "ETC"]);

        let err = config
            .merge_with_vars([("METRO_AUCTION_TIME_SCALE", "fast")])
            .unwrap_err();
        assert!(matches!(err, MetroError::Config { .. }));
    }

    #[test]
    fn test_env_ignores_other_sections() {
        let mut config = MetroConfig::default();
        config
            .merge_with_vars([
                ("METRO_LOG_LEVEL", "debug"),
                ("METRO_HOME", "/var/lib/metro"),
                ("METRO_AUCTION_DAILY_SUPPLY", "42"),
            ])
            .unwrap();
        assert_eq!(config.auction.daily_supply, 42);

        let err = config
            .merge_with_vars([("METRO_AUCTION_DAILY_SUPLY", "42")])
            .unwrap_err();
        assert!(matches!(err, MetroError::Config { .. }));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = MetroConfig::default();
        config.auction.starting_price = 1;
        assert!(config.validate().is_err());

        let mut config = MetroConfig::default();
        config.auction.time_scale = 0;
        assert!(config.validate().is_err());

        let mut config = MetroConfig::default();
        config.bridge.local_chain = "BTC".to_string();
        assert!(config.validate().is_err());

        let mut config = MetroConfig::default();
        config.auction.initial_auction_supply = config.auction.supply_cap + 1;
        assert!(config.validate().is_err());
    }
}
