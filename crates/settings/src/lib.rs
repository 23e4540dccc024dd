//! RewardCraft Settings
//!
//! Configuration for the RewardCraft CLI.
//!
//! ## Features
//!
//! - Reward contract and root document location
//! - Chain connection (mock or live JSON-RPC)
//! - Token display settings
//! - Cross-platform config file storage
//!
//! ## Usage
//!
//! ```no_run
//! use rewardcraft_settings::Settings;
//!
//! let mut settings = Settings::load_or_default()?;
//! settings.set("rewards.required_chain_id", "137")?;
//! settings.save()?;
//! # Ok::<(), rewardcraft_settings::SettingsError>(())
//! ```

mod config;
mod paths;

pub use config::{ChainMode, ChainSettings, RewardsSettings, Settings, TokenSettings};
pub use paths::{default_config_dir, expand_path};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings: {0}")]
    ReadError(std::io::Error),

    #[error("Failed to write settings: {0}")]
    WriteError(std::io::Error),

    #[error("Failed to parse settings: {0}")]
    ParseError(serde_json::Error),

    #[error("Failed to create config directory: {0}")]
    CreateDirError(std::io::Error),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Unknown setting: {0}")]
    UnknownKey(String),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/// Get the default settings file path
pub fn default_settings_path() -> PathBuf {
    default_config_dir().join("settings.json")
}
