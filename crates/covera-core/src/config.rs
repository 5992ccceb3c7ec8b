//! Configuration resolution for Covera.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/covera/settings.json)
//! 3. Project config (.covera/settings.json)
//! 4. Environment variables (highest priority)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::amount::Amount;
use crate::error::{Error, Result};

/// Complete Covera configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// Chain adapter and provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// JSON-RPC endpoint of a wallet/ledger node. When unset, operations run
    /// against the in-process dev wallet and local settlement.
    pub rpc_url: Option<String>,
    /// Admin address override. When unset on the ledger path, the ledger's
    /// own `owner` is authoritative.
    pub owner_address: Option<String>,
    /// Request timeout for RPC calls (seconds).
    pub request_timeout_secs: u64,
    /// Poll interval for account/network change detection (seconds).
    pub poll_interval_secs: u64,
    /// Starting balance handed to dev-wallet accounts.
    pub dev_balance: Amount,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            owner_address: None,
            request_timeout_secs: 30,
            poll_interval_secs: 5,
            dev_balance: Amount::from_base_units(1_500_000_000_000_000_000), // 1.5 coins
        }
    }
}

/// Data store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Seed the store with the demo policy catalog on startup.
    pub seed_sample_data: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            seed_sample_data: true,
        }
    }
}

/// Load configuration with hierarchical resolution.
pub fn load_config(project_dir: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    // Load global config
    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            let global = load_config_file(&global_path)?;
            merge_config(&mut config, global);
        }
    }

    // Load project config
    if let Some(dir) = project_dir {
        let project_path = dir.join(".covera").join("settings.json");
        if project_path.exists() {
            let project = load_config_file(&project_path)?;
            merge_config(&mut config, project);
        }
    }

    // Apply environment overrides
    apply_env_overrides(&mut config);

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".covera").join("settings.json"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/covera/settings.json"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("covera").join("settings.json"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: Config) {
    // Merge chain config
    if overlay.chain.rpc_url.is_some() {
        base.chain.rpc_url = overlay.chain.rpc_url;
    }
    if overlay.chain.owner_address.is_some() {
        base.chain.owner_address = overlay.chain.owner_address;
    }
    base.chain.request_timeout_secs = overlay.chain.request_timeout_secs;
    base.chain.poll_interval_secs = overlay.chain.poll_interval_secs;
    base.chain.dev_balance = overlay.chain.dev_balance;

    // Merge store config
    base.store = overlay.store;
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(val) = std::env::var("COVERA_RPC_URL") {
        config.chain.rpc_url = Some(val);
    }
    if let Ok(val) = std::env::var("COVERA_OWNER_ADDRESS") {
        config.chain.owner_address = Some(val);
    }
    if let Ok(val) = std::env::var("COVERA_DEV_BALANCE") {
        if let Ok(amount) = Amount::parse(&val) {
            config.chain.dev_balance = amount;
        }
    }
    if let Ok(val) = std::env::var("COVERA_SEED_SAMPLE_DATA") {
        if let Ok(flag) = val.parse() {
            config.store.seed_sample_data = flag;
        }
    }
}
