//! Decimal money handling shared by the quote and payment wire types.
//!
//! Amounts are never floats on the wire; atomic stablecoin amounts are
//! decimal strings, and USD-facing amounts are [`rust_decimal::Decimal`].

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use std::str::FromStr;

/// Atomic-unit amount of a stablecoin, serialized as a plain decimal string
/// with no thousands separators (e.g. `"30000"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AtomicAmount(pub u128);

#[derive(Debug, thiserror::Error)]
pub enum AtomicAmountError {
    #[error("invalid atomic amount: {0}")]
    InvalidFormat(String),
}

impl TryFrom<String> for AtomicAmount {
    type Error = AtomicAmountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .parse::<u128>()
            .map(AtomicAmount)
            .map_err(|_| AtomicAmountError::InvalidFormat(value))
    }
}

impl From<AtomicAmount> for String {
    fn from(value: AtomicAmount) -> Self {
        value.0.to_string()
    }
}

/// Rounds a USD decimal up to two decimal places, matching the chargeable
/// amount computed by the pricing worker's quote formula.
pub fn ceil_to_cents(value: Decimal) -> Decimal {
    (value * Decimal::from(100)).ceil() / Decimal::from(100)
}

/// Converts a USD decimal amount into atomic units of a stablecoin with the
/// given number of on-chain decimals (USDC uses 6).
pub fn to_atomic_units(usd: Decimal, decimals: u32) -> Option<u128> {
    let scaled = usd * Decimal::from(10u64.pow(decimals));
    scaled.round().to_u128()
}

pub fn parse_decimal(s: &str) -> Result<Decimal, rust_decimal::Error> {
    Decimal::from_str(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_amount_round_trips() {
        let amount = AtomicAmount(30_000);
        let s: String = amount.clone().into();
        assert_eq!(s, "30000");
        let parsed: AtomicAmount = AtomicAmount::try_from(s).unwrap();
        assert_eq!(parsed, amount);
    }

    #[test]
    fn ceil_to_cents_rounds_up() {
        let value = Decimal::from_str("0.031").unwrap();
        assert_eq!(ceil_to_cents(value), Decimal::from_str("0.04").unwrap());
    }

    #[test]
    fn to_atomic_units_applies_decimals() {
        let usd = Decimal::from_str("0.03").unwrap();
        assert_eq!(to_atomic_units(usd, 6), Some(30_000));
    }
}
