//! Configuration types

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use rewardcraft_client::SessionConfig;
use rewardcraft_core::{parse_address, Address};
use rewardcraft_settlement::{SettlementConfig, SettlementMode};

use crate::{default_settings_path, expand_path, Result, SettingsError};

/// Main settings structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Reward contract and root documents
    #[serde(default)]
    pub rewards: RewardsSettings,

    /// Chain connection
    #[serde(default)]
    pub chain: ChainSettings,

    /// Token display
    #[serde(default)]
    pub token: TokenSettings,

    /// Custom settings file path (not serialized)
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

impl Settings {
    /// Load settings from the default path, or create defaults
    pub fn load_or_default() -> Result<Self> {
        Self::load_from(&default_settings_path())
    }

    /// Load settings from a specific path, or create defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let path = expand_path(path);
        if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(SettingsError::ReadError)?;
            let mut settings: Settings =
                serde_json::from_str(&content).map_err(SettingsError::ParseError)?;
            info!("Loaded settings from {:?}", path);
            settings.config_path = Some(path);
            Ok(settings)
        } else {
            Ok(Self {
                config_path: Some(path),
                ..Self::default()
            })
        }
    }

    /// Path this instance was loaded from
    pub fn config_path(&self) -> PathBuf {
        self.config_path.clone().unwrap_or_else(default_settings_path)
    }

    /// Save settings to the configured path
    pub fn save(&self) -> Result<()> {
        self.save_to(&self.config_path())
    }

    /// Save settings to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(SettingsError::CreateDirError)?;
            }
        }

        let content = serde_json::to_string_pretty(self).map_err(SettingsError::ParseError)?;
        std::fs::write(path, content).map_err(SettingsError::WriteError)?;
        info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Set a single value by dotted key, e.g. `chain.rpc_url`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let optional = |v: &str| (!v.is_empty()).then(|| v.to_string());
        match key {
            "rewards.claimant" => self.rewards.claimant = optional(value),
            "rewards.contract_address" => self.rewards.contract_address = value.to_string(),
            "rewards.merkle_base_url" => self.rewards.merkle_base_url = value.to_string(),
            "rewards.required_chain_id" => self.rewards.required_chain_id = parse_num(key, value)?,
            "rewards.publication_cadence_secs" => {
                self.rewards.publication_cadence_secs = parse_num(key, value)?
            }
            "rewards.explorer_tx_url" => self.rewards.explorer_tx_url = optional(value),
            "chain.mode" => {
                self.chain.mode = match value {
                    "mock" => ChainMode::Mock,
                    "live" => ChainMode::Live,
                    _ => return Err(invalid(key, "expected \"mock\" or \"live\"")),
                }
            }
            "chain.rpc_url" => self.chain.rpc_url = value.to_string(),
            "chain.sender" => self.chain.sender = optional(value),
            "chain.confirmation_timeout_secs" => {
                self.chain.confirmation_timeout_secs = parse_num(key, value)?
            }
            "chain.poll_interval_ms" => self.chain.poll_interval_ms = parse_num(key, value)?,
            "chain.http_timeout_secs" => self.chain.http_timeout_secs = parse_num(key, value)?,
            "token.symbol" => self.token.symbol = value.to_string(),
            "token.decimals" => self.token.decimals = parse_num(key, value)?,
            _ => return Err(SettingsError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    /// Session configuration for `claimant`, or the configured claimant.
    pub fn session_config(&self, claimant: Option<&str>) -> Result<SessionConfig> {
        let claimant = claimant
            .or(self.rewards.claimant.as_deref())
            .ok_or_else(|| invalid("rewards.claimant", "no claimant address configured"))?;

        if self.rewards.merkle_base_url.is_empty() {
            return Err(invalid("rewards.merkle_base_url", "not configured"));
        }

        Ok(SessionConfig {
            claimant: address_value("rewards.claimant", claimant)?,
            contract_address: self.rewards.contract()?,
            required_chain_id: self.rewards.required_chain_id,
            merkle_base_url: self.rewards.merkle_base_url.clone(),
            publication_cadence_secs: self.rewards.publication_cadence_secs,
        })
    }

    pub fn settlement_config(&self) -> Result<SettlementConfig> {
        let sender = self
            .chain
            .sender
            .as_deref()
            .map(|s| address_value("chain.sender", s))
            .transpose()?;

        Ok(SettlementConfig {
            mode: match self.chain.mode {
                ChainMode::Mock => SettlementMode::Mock,
                ChainMode::Live => SettlementMode::Live,
            },
            rpc_url: self.chain.rpc_url.clone(),
            contract_address: self.rewards.contract()?,
            sender,
            confirmation_timeout: Duration::from_secs(self.chain.confirmation_timeout_secs),
            poll_interval: Duration::from_millis(self.chain.poll_interval_ms),
        })
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> SettingsError {
    SettingsError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| invalid(key, e.to_string()))
}

fn address_value(key: &str, value: &str) -> Result<Address> {
    parse_address(value).map_err(|e| invalid(key, e.to_string()))
}

/// Reward contract and root document settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsSettings {
    /// Default claimant address
    #[serde(default)]
    pub claimant: Option<String>,

    /// Reward contract address (`0x…`)
    #[serde(default)]
    pub contract_address: String,

    /// Base URL serving `latest.json` and `{root}.json`
    #[serde(default)]
    pub merkle_base_url: String,

    /// Chain the contract is deployed on
    #[serde(default = "default_chain_id")]
    pub required_chain_id: u64,

    /// Expected time between root publications
    #[serde(default = "default_cadence")]
    pub publication_cadence_secs: u64,

    /// Transaction link template; `{tx}` is replaced by the hash
    #[serde(default)]
    pub explorer_tx_url: Option<String>,
}

fn default_chain_id() -> u64 {
    1
}

fn default_cadence() -> u64 {
    7 * 24 * 3600
}

impl Default for RewardsSettings {
    fn default() -> Self {
        Self {
            claimant: None,
            contract_address: String::new(),
            merkle_base_url: String::new(),
            required_chain_id: default_chain_id(),
            publication_cadence_secs: default_cadence(),
            explorer_tx_url: None,
        }
    }
}

impl RewardsSettings {
    fn contract(&self) -> Result<Address> {
        if self.contract_address.is_empty() {
            return Err(invalid("rewards.contract_address", "not configured"));
        }
        address_value("rewards.contract_address", &self.contract_address)
    }

    /// Explorer link for `tx_hex`, if a template is configured.
    pub fn tx_link(&self, tx_hex: &str) -> Option<String> {
        self.explorer_tx_url
            .as_ref()
            .map(|template| template.replace("{tx}", tx_hex))
    }
}

/// Chain mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChainMode {
    /// In-memory contract, no network
    #[default]
    Mock,
    /// JSON-RPC endpoint
    Live,
}

/// Chain connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSettings {
    #[serde(default)]
    pub mode: ChainMode,

    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Account that signs claims; defaults to the claimant
    #[serde(default)]
    pub sender: Option<String>,

    #[serde(default = "default_confirmation_timeout")]
    pub confirmation_timeout_secs: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Timeout for root document requests
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_confirmation_timeout() -> u64 {
    120
}

fn default_poll_interval() -> u64 {
    2000
}

fn default_http_timeout() -> u64 {
    30
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            mode: ChainMode::default(),
            rpc_url: default_rpc_url(),
            sender: None,
            confirmation_timeout_secs: default_confirmation_timeout(),
            poll_interval_ms: default_poll_interval(),
            http_timeout_secs: default_http_timeout(),
        }
    }
}

/// Token display settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSettings {
    #[serde(default = "default_symbol")]
    pub symbol: String,

    #[serde(default = "default_decimals")]
    pub decimals: u32,
}

fn default_symbol() -> String {
    "TOKEN".to_string()
}

fn default_decimals() -> u32 {
    18
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            decimals: default_decimals(),
        }
    }
}
