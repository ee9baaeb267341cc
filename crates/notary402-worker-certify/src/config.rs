//! Worker bootstrap configuration, read from environment variables (§6).

use std::env;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    MissingVar(String),
    #[error("invalid url in {0}: {1}")]
    InvalidUrl(String, url::ParseError),
}

pub struct CertifyConfig {
    pub ledger_private_key_hex: String,
    pub nag_discovery_url: url::Url,
    pub network: String,
    pub explorer_url_template: String,
}

pub fn load() -> Result<CertifyConfig, ConfigError> {
    let ledger_private_key_hex =
        env::var("LEDGER_PRIVATE_KEY").map_err(|_| ConfigError::MissingVar("LEDGER_PRIVATE_KEY".to_string()))?;
    let nag_raw = env::var("LEDGER_NAG_DISCOVERY_URL")
        .map_err(|_| ConfigError::MissingVar("LEDGER_NAG_DISCOVERY_URL".to_string()))?;
    let nag_discovery_url = url::Url::parse(&nag_raw)
        .map_err(|e| ConfigError::InvalidUrl("LEDGER_NAG_DISCOVERY_URL".to_string(), e))?;
    let network = env::var("LEDGER_NETWORK").unwrap_or_else(|_| "mainnet".to_string());
    let explorer_url_template = env::var("LEDGER_EXPLORER_URL_TEMPLATE")
        .unwrap_or_else(|_| "https://explorer.circularlabs.io/tx/{tx_id}".to_string());

    Ok(CertifyConfig {
        ledger_private_key_hex,
        nag_discovery_url,
        network,
        explorer_url_template,
    })
}
