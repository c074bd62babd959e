//! Configuration system for Convene.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $CONVENE_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/convene/config.toml
//!   3. ~/.config/convene/config.toml
//!
//! Defaults target the local two-org test network the contract ships
//! against: channel "mychannel", chaincode "basic", org "Org1MSP".

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConveneConfig {
    pub wallet: WalletConfig,
    pub ca: CaConfig,
    pub network: NetworkConfig,
    pub channel: ChannelConfig,
    pub timeouts: TimeoutConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Directory holding persisted identities, one file per label.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaConfig {
    /// Base URL of the certificate authority's REST endpoint.
    pub url: String,
    /// Label under which the CA admin identity is stored.
    pub admin_label: String,
    /// Bootstrap enrollment secret for the CA admin.
    pub admin_secret: String,
    /// MSP id of the organization this CA issues for.
    pub msp_id: String,
    /// Default affiliation for registered application users.
    pub affiliation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Gateway endpoints to dial, "host:port". Empty = discovery only.
    pub gateway_endpoints: Vec<String>,
    /// Resolve channel peers/orderers through the discovery service.
    pub discovery: bool,
    /// Rewrite discovered endpoints to localhost (local test networks).
    pub as_localhost: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub channel_name: String,
    pub contract_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Bound on the ordering/commit wait for submit transactions.
    pub commit_secs: u64,
    /// Bound on a single-peer evaluate round trip.
    pub evaluate_secs: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ConveneConfig {
    fn default() -> Self {
        Self {
            wallet: WalletConfig::default(),
            ca: CaConfig::default(),
            network: NetworkConfig::default(),
            channel: ChannelConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            path: data_dir().join("wallet"),
        }
    }
}

impl Default for CaConfig {
    fn default() -> Self {
        Self {
            url: "https://localhost:7054".into(),
            admin_label: "admin".into(),
            admin_secret: "adminpw".into(),
            msp_id: "Org1MSP".into(),
            affiliation: "org1.department1".into(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            gateway_endpoints: vec!["localhost:7051".into()],
            discovery: true,
            as_localhost: true,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            channel_name: "mychannel".into(),
            contract_name: "basic".into(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            commit_secs: 30,
            evaluate_secs: 15,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("convene")
}

fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("convene")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl ConveneConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            ConveneConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("CONVENE_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&ConveneConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text)
                .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply CONVENE_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("CONVENE_WALLET__PATH") {
            self.wallet.path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("CONVENE_CA__URL") {
            self.ca.url = v;
        }
        if let Ok(v) = std::env::var("CONVENE_CA__ADMIN_SECRET") {
            self.ca.admin_secret = v;
        }
        if let Ok(v) = std::env::var("CONVENE_CHANNEL__CHANNEL_NAME") {
            self.channel.channel_name = v;
        }
        if let Ok(v) = std::env::var("CONVENE_CHANNEL__CONTRACT_NAME") {
            self.channel.contract_name = v;
        }
        if let Ok(v) = std::env::var("CONVENE_NETWORK__DISCOVERY") {
            self.network.discovery = v == "true" || v == "1";
        }
        if let Ok(v) = std::env::var("CONVENE_NETWORK__AS_LOCALHOST") {
            self.network.as_localhost = v == "true" || v == "1";
        }
        if let Ok(v) = std::env::var("CONVENE_TIMEOUTS__COMMIT_SECS") {
            if let Ok(secs) = v.parse() {
                self.timeouts.commit_secs = secs;
            }
        }
    }
}
