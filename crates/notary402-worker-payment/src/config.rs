//! Per-network configuration, read from environment variables (§6).

use std::collections::HashMap;
use std::env;

use notary402_types::Network;

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub asset: String,
    pub payee: String,
    pub facilitator_url: url::Url,
    pub rpc_url: url::Url,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingVar(String),
    #[error("invalid url in {0}: {1}")]
    InvalidUrl(String, url::ParseError),
}

fn env_suffix(network: Network) -> &'static str {
    match network {
        Network::Base => "BASE",
        Network::BaseSepolia => "BASE_SEPOLIA",
        Network::Arbitrum => "ARBITRUM",
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingVar(name.to_string()))
}

fn required_url(name: &str) -> Result<url::Url, ConfigError> {
    let raw = required_env(name)?;
    url::Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(name.to_string(), e))
}

pub fn load_network_configs() -> Result<HashMap<Network, NetworkConfig>, ConfigError> {
    let mut configs = HashMap::new();
    for network in Network::variants() {
        let suffix = env_suffix(*network);
        let asset_var = format!("ASSET_{suffix}");
        let payee_var = format!("PAYEE_{suffix}");
        let facilitator_var = format!("FACILITATOR_URL_{suffix}");
        let rpc_var = format!("RPC_URL_{suffix}");

        // A network with no asset configured is simply not offered; only
        // Base Sepolia is required for tests and local development.
        let asset = match env::var(&asset_var) {
            Ok(value) => value,
            Err(_) => continue,
        };
        let payee = required_env(&payee_var)?;
        let facilitator_url = required_url(&facilitator_var)?;
        let rpc_url = required_url(&rpc_var)?;

        configs.insert(
            *network,
            NetworkConfig {
                asset,
                payee,
                facilitator_url,
                rpc_url,
            },
        );
    }
    Ok(configs)
}
