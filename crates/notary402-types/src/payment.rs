//! Stablecoin payment wire format (§6 of the specification this crate
//! implements): the `PaymentRequirement` a client is quoted and the
//! `Authorization` it signs back.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::network::Network;

static EVM_ADDRESS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap());
static HEX_NONCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{64}$").unwrap());
static HEX_32_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0x[0-9a-fA-F]{64}$").unwrap());

macro_rules! hex_wire_string {
    ($name:ident, $re:expr, $what:literal) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = WireFormatError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                if $re.is_match(&value) {
                    Ok(Self(value))
                } else {
                    Err(WireFormatError::Malformed {
                        what: $what,
                        value,
                    })
                }
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                $name::try_from(raw).map_err(serde::de::Error::custom)
            }
        }
    };
}

#[derive(Debug, thiserror::Error)]
pub enum WireFormatError {
    #[error("malformed {what}: {value}")]
    Malformed { what: &'static str, value: String },
}

hex_wire_string!(EvmAddress, EVM_ADDRESS_RE, "evm address");
hex_wire_string!(HexNonce, HEX_NONCE_RE, "32-byte hex nonce");
hex_wire_string!(Hex32, HEX_32_RE, "32-byte hex value");

/// What the orchestrator quotes the client, and what W1 hands back from
/// `create_payment_requirement`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequirement {
    pub x402_version: u8,
    pub scheme: String,
    pub network: Network,
    #[serde(rename = "maxAmountRequired")]
    pub max_amount_required: String,
    pub asset: EvmAddress,
    #[serde(rename = "payTo")]
    pub pay_to: EvmAddress,
    pub nonce: HexNonce,
    pub valid_until: i64,
    pub resource: String,
    pub description: String,
}

impl PaymentRequirement {
    pub const SCHEME: &'static str = "exact";
    pub const VERSION: u8 = 1;
}

/// The signed EIP-3009 `ReceiveWithAuthorization` message a client returns
/// via the `X-PAYMENT` header (base64-encoded JSON of this struct).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authorization {
    pub from: EvmAddress,
    pub to: EvmAddress,
    pub value: String,
    #[serde(rename = "validAfter")]
    pub valid_after: i64,
    #[serde(rename = "validBefore")]
    pub valid_before: i64,
    pub nonce: HexNonce,
    pub v: u8,
    pub r: Hex32,
    pub s: Hex32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evm_address_rejects_short_values() {
        assert!(EvmAddress::try_from("0x1234".to_string()).is_err());
    }

    #[test]
    fn evm_address_accepts_well_formed_value() {
        let addr = "0x".to_string() + &"ab".repeat(20);
        assert!(EvmAddress::try_from(addr).is_ok());
    }

    #[test]
    fn serializes_payment_requirement_with_expected_field_names() {
        let requirement = PaymentRequirement {
            x402_version: 1,
            scheme: "exact".to_string(),
            network: Network::BaseSepolia,
            max_amount_required: "30000".to_string(),
            asset: EvmAddress::try_from("0x".to_string() + &"11".repeat(20)).unwrap(),
            pay_to: EvmAddress::try_from("0x".to_string() + &"22".repeat(20)).unwrap(),
            nonce: HexNonce::try_from("0x".to_string() + &"33".repeat(32)).unwrap(),
            valid_until: 1_700_000_000,
            resource: "https://example.com/r".to_string(),
            description: "certification".to_string(),
        };
        let json = serde_json::to_string(&requirement).unwrap();
        assert!(json.contains("\"maxAmountRequired\":\"30000\""));
        assert!(json.contains("\"payTo\""));
    }
}
