//! Orchestrator configuration: environment variables (§6), loaded via
//! `dotenvy` and parsed the way the reference stack's own `Config` resolves
//! CLI args and per-chain env values.

use std::collections::HashMap;
use std::net::IpAddr;

use clap::Parser;
use notary402_types::network::Network;

#[derive(Parser, Debug)]
#[command(name = "notaryd")]
#[command(about = "Payment-gated blockchain certification orchestrator")]
pub struct CliArgs {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 50)]
    pub database_max_connections: u32,
    #[arg(long, env = "WEBHOOK_SIGNING_SECRET")]
    pub webhook_signing_secret: String,
    #[arg(long, env = "LEDGER_NAG_DISCOVERY_URL")]
    pub ledger_nag_discovery_url: url::Url,
    /// The service's own ledger address, derived from `LEDGER_PRIVATE_KEY`
    /// (the certification worker holds the key; the orchestrator only needs
    /// the address to pass as `from`/`to` on W2 calls).
    #[arg(long, env = "LEDGER_WALLET_ADDRESS")]
    pub ledger_wallet_address: String,
    #[arg(long, env = "WORKER_PAYMENT_BIN", default_value = "notary402-worker-payment")]
    pub worker_payment_bin: String,
    #[arg(long, env = "WORKER_CERTIFY_BIN", default_value = "notary402-worker-certify")]
    pub worker_certify_bin: String,
    #[arg(long, env = "WORKER_PRICING_BIN", default_value = "notary402-worker-pricing")]
    pub worker_pricing_bin: String,
    #[arg(long, env = "WORKER_ENCODE_BIN", default_value = "notary402-worker-encode")]
    pub worker_encode_bin: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingVar(String),
    #[error("invalid url in {0}: {1}")]
    InvalidUrl(String, url::ParseError),
}

/// Per-network values keyed the reference stack's way: `<VAR>_<NETWORK>`.
#[derive(Debug, Clone)]
pub struct NetworkAddresses {
    pub payee: HashMap<Network, String>,
    pub facilitator_url: HashMap<Network, String>,
    pub rpc_url: HashMap<Network, String>,
}

fn env_suffix(network: Network) -> &'static str {
    match network {
        Network::Base => "BASE",
        Network::BaseSepolia => "BASE_SEPOLIA",
        Network::Arbitrum => "ARBITRUM",
    }
}

pub fn load_network_addresses() -> NetworkAddresses {
    let mut payee = HashMap::new();
    let mut facilitator_url = HashMap::new();
    let mut rpc_url = HashMap::new();
    for network in Network::variants() {
        let network = *network;
        let suffix = env_suffix(network);
        if let Ok(v) = std::env::var(format!("PAYEE_{suffix}")) {
            payee.insert(network, v);
        }
        if let Ok(v) = std::env::var(format!("FACILITATOR_URL_{suffix}")) {
            facilitator_url.insert(network, v);
        }
        if let Ok(v) = std::env::var(format!("RPC_URL_{suffix}")) {
            rpc_url.insert(network, v);
        }
    }
    NetworkAddresses {
        payee,
        facilitator_url,
        rpc_url,
    }
}

pub struct Config {
    pub cli: CliArgs,
    pub networks: NetworkAddresses,
}

impl Config {
    pub fn load() -> Self {
        let cli = CliArgs::parse();
        let networks = load_network_addresses();
        Config { cli, networks }
    }
}
