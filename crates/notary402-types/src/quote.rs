//! Pricing/quote worker output (§4.6, §6).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceQuote {
    pub price: Decimal,
    pub cached_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub is_stale: bool,
}

/// The breakdown returned by `quote()`: `cost = size_charge * price`,
/// `total = cost * (1 + margin/100)`, rounded up to the cent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub usdc_amount: Decimal,
    pub cirx_fee: Decimal,
    pub cirx_price_usd: Decimal,
    pub margin_percent: Decimal,
    pub valid_until: chrono::DateTime<chrono::Utc>,
}

pub const DEFAULT_MARGIN_PERCENT: u32 = 65;
pub const SIZE_CHARGE_UNITS: u32 = 4;
pub const QUOTE_VALIDITY_SECS: i64 = 300;

/// `cost = 4 * price`; `total = cost * (1 + margin/100)`; result rounded up
/// to two decimal places.
pub fn compute_quote(price: Decimal, margin_percent: Decimal) -> (Decimal, Decimal) {
    let cost = Decimal::from(SIZE_CHARGE_UNITS) * price;
    let hundred = Decimal::from(100);
    let total = cost * (Decimal::ONE + margin_percent / hundred);
    let rounded = crate::money::ceil_to_cents(total);
    (cost, rounded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn matches_s1_scenario_numbers() {
        let price = Decimal::from_str("0.0044").unwrap();
        let (cost, total) = compute_quote(price, Decimal::from(DEFAULT_MARGIN_PERCENT));
        assert_eq!(cost, Decimal::from_str("0.0176").unwrap());
        assert_eq!(total, Decimal::from_str("0.03").unwrap());
    }
}
