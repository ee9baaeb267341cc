//! Worker bootstrap configuration, read from environment variables (§6).

use std::env;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid url in {0}: {1}")]
    InvalidUrl(String, url::ParseError),
}

pub struct PricingConfig {
    pub oracle_base_url: url::Url,
}

pub fn load() -> Result<PricingConfig, ConfigError> {
    let raw = env::var("PRICE_ORACLE_URL")
        .unwrap_or_else(|_| "https://oracle.internal/v1/price".to_string());
    let oracle_base_url = url::Url::parse(&raw)
        .map_err(|e| ConfigError::InvalidUrl("PRICE_ORACLE_URL".to_string(), e))?;
    Ok(PricingConfig { oracle_base_url })
}
