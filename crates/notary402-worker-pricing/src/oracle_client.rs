//! Outbound pricing oracle client. The oracle *fetch implementation* is out
//! of scope (§1); only the caching contract around it is specified, so
//! this adapter is intentionally thin.

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::PricingWorkerError;

#[derive(Debug, Deserialize)]
struct OracleResponse {
    price: Decimal,
}

pub struct OracleClient {
    http: reqwest::Client,
    base_url: url::Url,
}

impl OracleClient {
    pub fn new(base_url: url::Url) -> Self {
        OracleClient {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub async fn fetch_price(&self, symbol: &str, vs: &str) -> Result<Decimal, PricingWorkerError> {
        let response = self
            .http
            .get(self.base_url.clone())
            .query(&[("symbol", symbol), ("vs", vs)])
            .send()
            .await?;
        let body: OracleResponse = response.json().await?;
        Ok(body.price)
    }
}
