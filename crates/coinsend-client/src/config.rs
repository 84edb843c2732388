//! Client configuration

use crate::builder::BuilderConfig;
use coinsend_log::{warn, LogFormat};
use coinsend_math::{parse_coins, parse_dec_coin, Coins, DecCoin};
use coinsend_types::address::DEFAULT_BECH32_PREFIX;
use coinsend_types::SignMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("toml parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("toml serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Json,
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Admin API listen address
    pub listen: String,
    /// Largest request body the admin API accepts, in bytes
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
            max_body_bytes: 64 * 1024,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyringConfig {
    /// Key file directory; relative paths are resolved against the home dir
    pub dir: PathBuf,
}

impl Default for KeyringConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("keyring"),
        }
    }
}

/// On-disk configuration, `<home>/config.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Chain every request is signed for
    pub chain_id: String,
    /// CometBFT JSON-RPC endpoint
    pub rpc_endpoint: String,
    /// Cosmos SDK REST gateway
    pub api_endpoint: String,
    /// Human readable part of account addresses, e.g. `cosmos`
    pub bech32_prefix: String,
    /// `direct` or `amino-json`
    pub sign_mode: SignMode,
    /// Denominations the network accepts; empty accepts any valid denom
    pub denoms: Vec<String>,
    /// Gas limit for requests that name none
    pub default_gas_limit: u64,
    /// Fee used when a request names none, e.g. `5000stake`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_fee: Option<String>,
    /// Price per unit of gas, e.g. `0.025stake`. Takes precedence over
    /// `default_fee`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    /// Longest memo accepted, in UTF-8 bytes
    pub max_memo_bytes: usize,
    /// Deadline for each account query and broadcast, in seconds
    pub timeout_secs: u64,
    pub log: LogConfig,
    /// Admin HTTP API
    pub server: ServerConfig,
    pub keyring: KeyringConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            chain_id: "testing".to_string(),
            rpc_endpoint: "http://localhost:26657".to_string(),
            api_endpoint: "http://localhost:1317".to_string(),
            bech32_prefix: DEFAULT_BECH32_PREFIX.to_string(),
            sign_mode: SignMode::Direct,
            denoms: vec!["stake".to_string()],
            default_gas_limit: 200_000,
            default_fee: None,
            gas_price: None,
            max_memo_bytes: 256,
            timeout_secs: 30,
            log: LogConfig::default(),
            server: ServerConfig::default(),
            keyring: KeyringConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// `~/.coinsend`, or `.coinsend` when there is no home directory
    pub fn default_home() -> PathBuf {
        match dirs::home_dir() {
            Some(home) => home.join(".coinsend"),
            None => PathBuf::from(".coinsend"),
        }
    }

    /// Load `<home>/config.toml`, falling back to defaults when it is absent.
    pub fn load_or_default(home: &Path) -> Result<Self, ConfigError> {
        let path = home.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::load_from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write a default config into `home`. An existing file is kept unless
    /// `overwrite` is set.
    pub fn init(home: &Path, overwrite: bool) -> Result<Self, ConfigError> {
        fs::create_dir_all(home)?;
        let path = home.join(CONFIG_FILE_NAME);
        if path.exists() && !overwrite {
            return Self::load_from_file(path);
        }
        let config = Self::default();
        config.save_to_file(path)?;
        Ok(config)
    }

    pub fn keyring_dir(&self, home: &Path) -> PathBuf {
        if self.keyring.dir.is_absolute() {
            self.keyring.dir.clone()
        } else {
            home.join(&self.keyring.dir)
        }
    }

    /// Validate and freeze the settings a send needs.
    pub fn pipeline(&self) -> Result<PipelineConfig, ConfigError> {
        if self.chain_id.trim().is_empty() {
            return Err(invalid("chain_id", "must not be empty"));
        }
        if self.bech32_prefix.is_empty() {
            return Err(invalid("bech32_prefix", "must not be empty"));
        }
        Url::parse(&self.rpc_endpoint).map_err(|e| invalid("rpc_endpoint", e))?;
        Url::parse(&self.api_endpoint).map_err(|e| invalid("api_endpoint", e))?;

        match self.sign_mode {
            SignMode::Direct | SignMode::LegacyAminoJson => {}
            other => return Err(invalid("sign_mode", format!("{other} is not supported"))),
        }
        if self.default_gas_limit == 0 {
            return Err(invalid("default_gas_limit", "must be positive"));
        }
        if self.timeout_secs == 0 {
            return Err(invalid("timeout_secs", "must be positive"));
        }
        if let Some(denom) = self
            .denoms
            .iter()
            .find(|d| !coinsend_math::is_valid_denom(d))
        {
            return Err(invalid("denoms", format!("{denom} is not a valid denom")));
        }

        let default_fee = self
            .default_fee
            .as_deref()
            .map(parse_coins)
            .transpose()
            .map_err(|e| invalid("default_fee", e))?;
        let gas_price = self
            .gas_price
            .as_deref()
            .map(parse_dec_coin)
            .transpose()
            .map_err(|e| invalid("gas_price", e))?;

        Ok(PipelineConfig {
            chain_id: self.chain_id.clone(),
            rpc_endpoint: self.rpc_endpoint.clone(),
            api_endpoint: self.api_endpoint.clone(),
            builder: BuilderConfig {
                bech32_prefix: self.bech32_prefix.clone(),
                sign_mode: self.sign_mode,
                denoms: self.denoms.clone(),
                max_memo_bytes: self.max_memo_bytes,
            },
            default_gas_limit: self.default_gas_limit,
            default_fee,
            gas_price,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

/// Settings fixed before the first send and shared read-only by all sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Requests for any other chain fail validation
    pub chain_id: String,
    /// CometBFT JSON-RPC endpoint, used by [`TransferClient::connect`]
    ///
    /// [`TransferClient::connect`]: crate::TransferClient::connect
    pub rpc_endpoint: String,
    /// REST gateway used for account queries
    pub api_endpoint: String,
    /// Address prefix, sign mode and request limits
    pub builder: BuilderConfig,
    pub default_gas_limit: u64,
    /// Flat fee for requests without one, when no gas price is set
    pub default_fee: Option<Coins>,
    /// Fee per unit of gas, rounded up to a whole coin
    pub gas_price: Option<DecCoin>,
    /// Deadline for each network call
    pub timeout: Duration,
}

impl PipelineConfig {
    /// Fee for a request that did not name one.
    ///
    /// A configured gas price wins over the flat default fee; with neither
    /// the fee is empty.
    pub fn fee_for(&self, gas_limit: u64) -> Coins {
        if let Some(price) = &self.gas_price {
            match price.fee_for_gas(gas_limit) {
                Some(coin) if !coin.is_zero() => return Coins::from_wire(vec![coin]),
                Some(_) => {}
                None => warn!(
                    gas_price = %price,
                    gas_limit,
                    "fee for gas overflows, using the default fee"
                ),
            }
        }
        self.default_fee.clone().unwrap_or_default()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chain_id: "testing".to_string(),
            rpc_endpoint: "http://localhost:26657".to_string(),
            api_endpoint: "http://localhost:1317".to_string(),
            builder: BuilderConfig::default(),
            default_gas_limit: 200_000,
            default_fee: None,
            gas_price: None,
            timeout: Duration::from_secs(30),
        }
    }
}
