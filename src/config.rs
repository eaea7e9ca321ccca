//! Exporter configuration: optional `config.toml` plus environment
//! overrides, read once at startup and immutable afterwards.

use std::fs;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use tracing::{info, warn};

use crate::constants;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_ip: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub rpc_url: String,
    pub local_rpc_url: Option<String>,
    pub identity_key: Option<String>,
    pub vote_key: Option<String>,
    pub timeout_secs: u64,
    pub max_connections: usize,
    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rpc_url: constants::DEFAULT_RPC_URL.to_string(),
            local_rpc_url: None,
            identity_key: None,
            vote_key: None,
            timeout_secs: 10,
            max_connections: 20,
            server: ServerConfig::default(),
        }
    }
}

pub fn load_config() -> Result<AppConfig> {
    let mut config: AppConfig = match fs::read_to_string("config.toml") {
        Ok(raw) => toml::from_str(&raw).context("failed to parse config.toml")?,
        Err(_) => AppConfig::default(),
    };

    if let Ok(url) = std::env::var("SOLANA_RPC_URL") {
        if !url.is_empty() {
            config.rpc_url = url;
        }
    }
    if let Ok(url) = std::env::var("SOLANA_LOCAL_RPC_URL") {
        config.local_rpc_url = Some(url);
    }
    if let Ok(key) = std::env::var("SOLANA_IDENTITY_KEY") {
        config.identity_key = Some(key);
    }
    if let Ok(key) = std::env::var("SOLANA_VOTE_KEY") {
        config.vote_key = Some(key);
    }
    if let Ok(timeout) = std::env::var("SOLANA_RPC_TIMEOUT") {
        config.timeout_secs = timeout
            .parse()
            .context("SOLANA_RPC_TIMEOUT must be an integer number of seconds")?;
    }
    if let Ok(max) = std::env::var("SOLANA_MAX_CONNECTIONS") {
        config.max_connections = max
            .parse()
            .context("SOLANA_MAX_CONNECTIONS must be an integer")?;
    }

    Ok(normalize(config))
}

/// Empty strings (unset env vars exported as "") count as not configured.
fn normalize(mut config: AppConfig) -> AppConfig {
    config.local_rpc_url = config.local_rpc_url.filter(|url| !url.is_empty());
    config.identity_key = config.identity_key.filter(|key| !key.is_empty());
    config.vote_key = config.vote_key.filter(|key| !key.is_empty());
    config
}

impl AppConfig {
    /// Log the effective configuration. Missing keys just disable their
    /// metrics; malformed keys are fatal.
    pub fn validate(&self) -> Result<()> {
        match &self.identity_key {
            Some(key) => {
                Pubkey::from_str(key)
                    .with_context(|| format!("invalid identity key: {key}"))?;
                info!("identity key: {key}");
            }
            None => warn!("identity key not set - validator-scoped metrics will be unavailable"),
        }
        match &self.vote_key {
            Some(key) => {
                Pubkey::from_str(key).with_context(|| format!("invalid vote key: {key}"))?;
                info!("vote key: {key}");
            }
            None => warn!("vote key not set - vote-scoped metrics will be unavailable"),
        }
        if self.local_rpc_url.is_none() {
            info!("local RPC URL not set - local health checks disabled");
        }
        info!("RPC URL: {}", self.rpc_url);
        info!(
            "local RPC URL: {}",
            self.local_rpc_url.as_deref().unwrap_or("disabled")
        );
        Ok(())
    }
}
