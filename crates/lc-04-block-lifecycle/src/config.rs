//! Configuration types for the block lifecycle

use lc_01_storage_overlay::CompressionConfig;
use serde::Deserialize;
use shared_types::{unit_value, U256};
use std::env;

/// Protocol version from which explicit gas fields, script size limits and
/// payer co-signatures apply.
pub const PROTOCOL_VERSION_13: u32 = 13;

/// Runtime configuration for one chain
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChainConfig {
    /// Symbol of the token fees are paid in
    pub fuel_token_symbol: String,

    /// Decimals of the fuel token
    pub fuel_token_decimals: u32,

    /// Liquidity token kept in the method table although it is a system token
    pub staking_token_symbol: String,

    /// Largest script accepted from protocol 13 on (bytes)
    pub max_script_size: usize,

    /// Base gas limit of system transactions
    pub transaction_gas_limit: u64,

    /// Inflation gas multiplier before protocol 13
    pub inflation_gas_multiplier: u64,

    /// Inflation gas multiplier from protocol 13 on
    pub inflation_gas_multiplier_v13: u64,

    /// Calls exempt from the fee and balance checks, as `contract.method`
    pub whitelisted_methods: Vec<String>,

    /// Fuel a whitelisted call's pool must hold, in base units.
    /// `None` means one tenth of a whole fuel token.
    pub min_pot_balance: Option<u64>,

    /// Failure filter
    pub red_filter: RedFilterConfig,

    /// Block and transaction compression
    pub compression: CompressionSettings,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            fuel_token_symbol: "FUEL".to_string(),
            fuel_token_decimals: 10,
            staking_token_symbol: "STAKE".to_string(),
            max_script_size: 24 * 1024,
            transaction_gas_limit: 9999,
            inflation_gas_multiplier: 1000,
            inflation_gas_multiplier_v13: 10000,
            whitelisted_methods: vec!["swap.SwapFee".to_string(), "exchange.SwapFee".to_string()],
            min_pot_balance: None,
            red_filter: RedFilterConfig::default(),
            compression: CompressionSettings::default(),
        }
    }
}

impl ChainConfig {
    /// Load defaults, then apply environment overrides.
    ///
    /// # Environment Variables
    ///
    /// - `LC_FUEL_SYMBOL`, `LC_FUEL_DECIMALS`, `LC_STAKING_SYMBOL`
    /// - `LC_MAX_SCRIPT_SIZE`, `LC_TX_GAS_LIMIT`
    /// - `LC_WHITELISTED_METHODS`: comma separated `contract.method` list
    /// - `LC_MIN_POT_BALANCE`
    /// - `LC_RED_FILTER`: `true`/`1` to enable
    /// - `LC_COMPRESSION`: `false`/`0` to store raw bincode
    /// - `LC_COMPRESSION_LEVEL`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(symbol) = env::var("LC_FUEL_SYMBOL") {
            config.fuel_token_symbol = symbol;
        }
        if let Some(decimals) = parse_env("LC_FUEL_DECIMALS") {
            config.fuel_token_decimals = decimals;
        }
        if let Ok(symbol) = env::var("LC_STAKING_SYMBOL") {
            config.staking_token_symbol = symbol;
        }
        if let Some(size) = parse_env("LC_MAX_SCRIPT_SIZE") {
            config.max_script_size = size;
        }
        if let Some(limit) = parse_env("LC_TX_GAS_LIMIT") {
            config.transaction_gas_limit = limit;
        }
        if let Ok(methods) = env::var("LC_WHITELISTED_METHODS") {
            config.whitelisted_methods = methods
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(String::from)
                .collect();
        }
        if let Some(balance) = parse_env("LC_MIN_POT_BALANCE") {
            config.min_pot_balance = Some(balance);
        }
        if let Ok(value) = env::var("LC_RED_FILTER") {
            config.red_filter.enabled = is_truthy(&value);
        }
        if let Ok(value) = env::var("LC_COMPRESSION") {
            config.compression.enabled = is_truthy(&value);
        }
        if let Some(level) = parse_env("LC_COMPRESSION_LEVEL") {
            config.compression.level = level;
        }

        config
    }

    /// Gas limit of the inflation transaction at `protocol`.
    pub fn inflation_gas_limit(&self, protocol: u32) -> U256 {
        let multiplier = if protocol >= PROTOCOL_VERSION_13 {
            self.inflation_gas_multiplier_v13
        } else {
            self.inflation_gas_multiplier
        };
        U256::from(self.transaction_gas_limit) * U256::from(multiplier)
    }

    /// Minimum fuel balance of a whitelisted call's pool.
    pub fn min_pot_balance(&self) -> U256 {
        match self.min_pot_balance {
            Some(balance) => U256::from(balance),
            None => unit_value(self.fuel_token_decimals) / U256::from(10u64),
        }
    }

    pub fn is_whitelisted(&self, method: &str) -> bool {
        self.whitelisted_methods.iter().any(|m| m == method)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

fn is_truthy(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Failure filter settings
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RedFilterConfig {
    /// Record addresses named in fault messages
    pub enabled: bool,
}

/// Persisted record compression
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CompressionSettings {
    pub enabled: bool,
    /// zstd level, 1-22
    pub level: i32,
}

impl Default for CompressionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            level: 3,
        }
    }
}

impl CompressionSettings {
    pub fn to_compression_config(&self) -> CompressionConfig {
        CompressionConfig {
            level: self.level,
            enabled: self.enabled,
        }
    }
}

/// Log output settings
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub log_level: String,

    /// Emit JSON lines instead of human-readable output
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// `LC_LOG_LEVEL` and `LC_JSON_LOGS` over the defaults.
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("LC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            json_logs: env::var("LC_JSON_LOGS")
                .map(|v| is_truthy(&v))
                .unwrap_or(false),
        }
    }
}
