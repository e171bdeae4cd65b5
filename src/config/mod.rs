use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use alloy::primitives::{address, Address};
use serde::Deserialize;

/// Membership contract the client is pinned to.
pub const PARTY_CONTRACT: Address = address!("5ba800BCCEb770fC8Bb7c2c1dC3C72535F0Aa847");

/// The single network this client talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub name: &'static str,
    pub currency_symbol: &'static str,
    pub currency_decimals: u8,
    pub rpc_url: &'static str,
    pub explorer_url: &'static str,
}

impl NetworkConfig {
    pub fn tea_sepolia() -> Self {
        Self {
            chain_id: 10218,
            name: "Tea Sepolia Testnet",
            currency_symbol: "TEA",
            currency_decimals: 18,
            rpc_url: "https://tea-sepolia.g.alchemy.com/public",
            explorer_url: "https://sepolia.tea.xyz/",
        }
    }

    /// Explorer page for a transaction hash
    pub fn tx_url(&self, hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url.trim_end_matches('/'), hash)
    }
}

/// Tunables read from `config.toml`. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub read_timeout_ms: Option<u64>,

    #[serde(default)]
    pub confirmation_timeout_secs: Option<u64>,

    #[serde(default)]
    pub poll_interval_secs: Option<u64>,

    #[serde(default)]
    pub private_key_env: Option<String>,
}

/// Process-wide configuration, built once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub contract: Address,
    pub read_timeout: Duration,
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
    pub private_key_env: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::tea_sepolia(),
            contract: PARTY_CONTRACT,
            read_timeout: Duration::from_secs(10),
            confirmation_timeout: Duration::from_secs(180),
            poll_interval: Duration::from_secs(12),
            private_key_env: "PARTYTEA_PRIVATE_KEY".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_file(file: FileConfig) -> Self {
        let defaults = Self::default();
        Self {
            read_timeout: file
                .read_timeout_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.read_timeout),
            confirmation_timeout: file
                .confirmation_timeout_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.confirmation_timeout),
            poll_interval: file
                .poll_interval_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
            private_key_env: file
                .private_key_env
                .filter(|name| !name.trim().is_empty())
                .unwrap_or(defaults.private_key_env),
            ..defaults
        }
    }
}

pub fn load() -> AppConfig {
    let Some(path) = config_path() else {
        return AppConfig::default();
    };
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => return AppConfig::default(),
    };
    AppConfig::from_file(toml::from_str::<FileConfig>(&content).unwrap_or_default())
}

pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("PARTYTEA_CONFIG").map(PathBuf::from) {
        return Some(path);
    }
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from) {
        return Some(xdg.join("partytea").join("config.toml"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".config").join("partytea").join("config.toml"));
    }

    directories::ProjectDirs::from("xyz", "partytea", "partytea")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

pub fn data_dir() -> Option<PathBuf> {
    if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").map(PathBuf::from) {
        return Some(xdg.join("partytea"));
    }
    if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
        return Some(home.join(".local").join("share").join("partytea"));
    }
    directories::ProjectDirs::from("xyz", "partytea", "partytea")
        .map(|dirs| dirs.data_dir().to_path_buf())
}

pub fn log_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("partytea.log"))
}

/// Shorten a `0x…` string for display
pub fn short_addr(value: &str) -> String {
    let value = value.trim();
    if value.len() <= 10 {
        return value.to_string();
    }
    let start: String = value.chars().take(6).collect();
    let end: String = value
        .chars()
        .rev()
        .take(4)
        .collect::<String>()
        .chars()
        .rev()
        .collect();
    format!("{}..{}", start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_overrides() {
        let file: FileConfig = toml::from_str(
            r#"
            read_timeout_ms = 2500
            poll_interval_secs = 0
            private_key_env = "MY_KEY"
            "#,
        )
        .unwrap();
        let config = AppConfig::from_file(file);
        assert_eq!(config.read_timeout, Duration::from_millis(2500));
        // zero falls back to the default
        assert_eq!(config.poll_interval, Duration::from_secs(12));
        assert_eq!(config.private_key_env, "MY_KEY");
        assert_eq!(config.network.chain_id, 10218);
        assert_eq!(config.contract, PARTY_CONTRACT);
    }

    #[test]
    fn test_tx_url() {
        let network = NetworkConfig::tea_sepolia();
        assert_eq!(network.tx_url("0xabc"), "https://sepolia.tea.xyz/tx/0xabc");
    }

    #[test]
    fn test_short_addr() {
        assert_eq!(
            short_addr("0x5ba800BCCEb770fC8Bb7c2c1dC3C72535F0Aa847"),
            "0x5ba8..a847"
        );
        assert_eq!(short_addr("0x1234"), "0x1234");
    }
}
