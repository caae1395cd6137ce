//! Environment-based Configuration for the tBTC Client
//!
//! The orchestrator does not own chain connections; it is handed an Ethereum
//! client and a Bitcoin client. What it does need is the network tier, the
//! Bitcoin network used for address derivation, and the Electrum profile the
//! Bitcoin client should connect with.
//!
//! # Environment Variables
//!
//! - `TBTC_NETWORK` - "main", "test" or "dev" (default: "test")
//! - `TBTC_BITCOIN_NETWORK` - "bitcoin", "testnet", "regtest" or "signet"
//!   (default: derived from the tier)
//! - `TBTC_ELECTRUM_PROFILES` - JSON object of profile name to
//!   `{"server": ..., "port": ..., "protocol": "ssl" | "wss" | "tcp"}`
//!   (required on main, defaults elsewhere)
//! - `TBTC_ELECTRUM_PROFILE` - Name of the profile to use
//! - `TBTC_ARTIFACTS_DIR` - Directory of contract deployment artifacts
//! - `TBTC_LOG_LEVEL` - Logging level (trace, debug, info, warn, error)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("unknown electrum profile {0}; available: {1}")]
    UnknownProfile(String, String),
}

/// Network tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Main,
    Test,
    Dev,
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "main" | "mainnet" => Ok(Network::Main),
            "test" | "testnet" | "ropsten" => Ok(Network::Test),
            "dev" | "devnet" | "local" => Ok(Network::Dev),
            _ => Err(ConfigError::InvalidValue(
                "TBTC_NETWORK".to_string(),
                format!("unknown network: {}", s),
            )),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Main => write!(f, "main"),
            Network::Test => write!(f, "test"),
            Network::Dev => write!(f, "dev"),
        }
    }
}

impl Network {
    /// Bitcoin network a deposit on this tier is funded on
    pub fn default_bitcoin_network(&self) -> bitcoin::Network {
        match self {
            Network::Main => bitcoin::Network::Bitcoin,
            Network::Test => bitcoin::Network::Testnet,
            Network::Dev => bitcoin::Network::Regtest,
        }
    }

    /// Profile selected when `TBTC_ELECTRUM_PROFILE` is unset
    pub fn default_electrum_profile(&self) -> &'static str {
        match self {
            Network::Main => "mainnet",
            Network::Test => "testnet",
            Network::Dev => "regtest",
        }
    }
}

/// Parse a Bitcoin network name
pub fn parse_bitcoin_network(s: &str) -> Result<bitcoin::Network, ConfigError> {
    match s.to_lowercase().as_str() {
        "bitcoin" | "main" | "mainnet" => Ok(bitcoin::Network::Bitcoin),
        "testnet" | "test" => Ok(bitcoin::Network::Testnet),
        "regtest" => Ok(bitcoin::Network::Regtest),
        "signet" => Ok(bitcoin::Network::Signet),
        _ => Err(ConfigError::InvalidValue(
            "TBTC_BITCOIN_NETWORK".to_string(),
            format!("unknown bitcoin network: {}", s),
        )),
    }
}

/// Transport an Electrum server speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectrumProtocol {
    Ssl,
    Wss,
    Tcp,
}

/// One Electrum server profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectrumProfile {
    pub server: String,
    pub port: u16,
    pub protocol: ElectrumProtocol,
}

impl ElectrumProfile {
    pub fn new(server: impl Into<String>, port: u16, protocol: ElectrumProtocol) -> Self {
        Self {
            server: server.into(),
            port,
            protocol,
        }
    }

    /// Connection URL, e.g. `ssl://host:50002`
    pub fn url(&self) -> String {
        let scheme = match self.protocol {
            ElectrumProtocol::Ssl => "ssl",
            ElectrumProtocol::Wss => "wss",
            ElectrumProtocol::Tcp => "tcp",
        };
        format!("{}://{}:{}", scheme, self.server, self.port)
    }
}

/// Named Electrum profiles, keyed by tier/variant (e.g. "testnet", "testnetWS")
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElectrumConfig {
    pub profiles: BTreeMap<String, ElectrumProfile>,
}

impl ElectrumConfig {
    /// Parse from the JSON shape used by `TBTC_ELECTRUM_PROFILES`
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| {
            ConfigError::InvalidValue("TBTC_ELECTRUM_PROFILES".to_string(), e.to_string())
        })
    }

    /// Built-in profiles for a tier, or `None` where operators must supply them
    pub fn defaults_for(network: Network) -> Option<Self> {
        let mut profiles = BTreeMap::new();
        match network {
            Network::Main => return None,
            Network::Test => {
                profiles.insert(
                    "testnet".to_string(),
                    ElectrumProfile::new(
                        "electrumx-server.test.tbtc.network",
                        50002,
                        ElectrumProtocol::Ssl,
                    ),
                );
                profiles.insert(
                    "testnetPublic".to_string(),
                    ElectrumProfile::new("testnet1.bauerj.eu", 50002, ElectrumProtocol::Ssl),
                );
                profiles.insert(
                    "testnetWS".to_string(),
                    ElectrumProfile::new(
                        "electrumx-server.test.tbtc.network",
                        8443,
                        ElectrumProtocol::Wss,
                    ),
                );
            }
            Network::Dev => {
                profiles.insert(
                    "regtest".to_string(),
                    ElectrumProfile::new("127.0.0.1", 50001, ElectrumProtocol::Tcp),
                );
            }
        }
        Some(Self { profiles })
    }

    /// Look up a profile by name
    pub fn select(&self, name: &str) -> Result<&ElectrumProfile, ConfigError> {
        self.profiles.get(name).ok_or_else(|| {
            ConfigError::UnknownProfile(
                name.to_string(),
                self.profiles.keys().cloned().collect::<Vec<_>>().join(","),
            )
        })
    }
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct TbtcConfig {
    /// Network tier
    pub network: Network,

    /// Bitcoin network used for funding address derivation and script decoding
    pub bitcoin_network: bitcoin::Network,

    /// Available Electrum profiles
    pub electrum: ElectrumConfig,

    /// Selected Electrum profile name
    pub electrum_profile: String,

    /// Deployment artifacts directory, if artifacts are loaded from disk
    pub artifacts_dir: Option<PathBuf>,

    /// Log level
    pub log_level: String,
}

impl TbtcConfig {
    /// Defaults for a tier, without touching the environment
    pub fn for_network(network: Network) -> Self {
        Self {
            network,
            bitcoin_network: network.default_bitcoin_network(),
            electrum: ElectrumConfig::defaults_for(network).unwrap_or_default(),
            electrum_profile: network.default_electrum_profile().to_string(),
            artifacts_dir: None,
            log_level: "info".to_string(),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let network: Network = env::var("TBTC_NETWORK")
            .unwrap_or_else(|_| "test".to_string())
            .parse()?;

        let bitcoin_network = match env::var("TBTC_BITCOIN_NETWORK") {
            Ok(value) => parse_bitcoin_network(&value)?,
            Err(_) => network.default_bitcoin_network(),
        };

        let electrum = match env::var("TBTC_ELECTRUM_PROFILES") {
            Ok(json) => ElectrumConfig::from_json(&json)?,
            Err(_) => ElectrumConfig::defaults_for(network)
                .ok_or_else(|| ConfigError::MissingEnvVar("TBTC_ELECTRUM_PROFILES".to_string()))?,
        };

        let electrum_profile = env::var("TBTC_ELECTRUM_PROFILE")
            .unwrap_or_else(|_| network.default_electrum_profile().to_string());

        let artifacts_dir = env::var("TBTC_ARTIFACTS_DIR").ok().map(PathBuf::from);

        let log_level = env::var("TBTC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let config = Self {
            network,
            bitcoin_network,
            electrum,
            electrum_profile,
            artifacts_dir,
            log_level,
        };
        config.validate()?;

        Ok(config)
    }

    /// Load a `.env` file if present, then read the environment
    pub fn from_dotenv() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_env()
    }

    /// Check that the selected Electrum profile exists
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.electrum.select(&self.electrum_profile)?;
        Ok(())
    }

    /// The Electrum profile the Bitcoin client should use
    pub fn electrum_profile(&self) -> Result<&ElectrumProfile, ConfigError> {
        self.electrum.select(&self.electrum_profile)
    }

    /// Log a configuration summary
    pub fn log_summary(&self) {
        tracing::info!(
            network = %self.network,
            bitcoin_network = %self.bitcoin_network,
            electrum_profile = %self.electrum_profile,
            electrum_url = %self
                .electrum_profile()
                .map(|p| p.url())
                .unwrap_or_else(|_| "<missing>".to_string()),
            "tBTC client configuration"
        );
    }
}
