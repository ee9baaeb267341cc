//! Supported EVM settlement networks.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// An EVM network the payment worker can settle stablecoin authorizations on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    Base,
    BaseSepolia,
    Arbitrum,
}

impl Network {
    pub fn variants() -> &'static [Network] {
        &[Network::Base, Network::BaseSepolia, Network::Arbitrum]
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Base => 8453,
            Network::BaseSepolia => 84532,
            Network::Arbitrum => 42161,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Network::Base => "base",
            Network::BaseSepolia => "base-sepolia",
            Network::Arbitrum => "arbitrum",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported network: {0}")]
pub struct UnsupportedNetwork(pub String);

impl FromStr for Network {
    type Err = UnsupportedNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "base" => Ok(Network::Base),
            "base-sepolia" => Ok(Network::BaseSepolia),
            "arbitrum" => Ok(Network::Arbitrum),
            other => Err(UnsupportedNetwork(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_display_and_from_str() {
        for network in Network::variants() {
            let s = network.to_string();
            let parsed: Network = s.parse().unwrap();
            assert_eq!(parsed, *network);
        }
    }

    #[test]
    fn rejects_unknown_network() {
        assert!("base-mainnet".parse::<Network>().is_err());
    }
}
