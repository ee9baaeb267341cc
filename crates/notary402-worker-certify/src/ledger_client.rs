//! L5: resolves the ledger's network-access gateway at startup, builds
//! method endpoints of the form `<base>Circular_<Method>_<network>`, and
//! submits/polls transactions.

use std::time::Duration;

use notary402_types::ledger::CertificationTransaction;
use serde::Deserialize;
use tracing::instrument;

use crate::error::CertifyWorkerError;

pub const LEDGER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct LedgerClient {
    http: reqwest::Client,
    base_url: String,
    network: String,
}

#[derive(Debug, Deserialize)]
struct DiscoveryResponse {
    url: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    #[serde(rename = "TxID")]
    pub tx_id: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "BlockID", default)]
    pub block_id: Option<String>,
    #[serde(rename = "Timestamp", default)]
    pub timestamp: Option<String>,
}

impl LedgerClient {
    /// Queries the discovery URL once at worker startup and caches the
    /// resolved base URL for the worker's lifetime.
    #[instrument(skip(http))]
    pub async fn discover(
        http: reqwest::Client,
        discovery_url: &url::Url,
        network: &str,
    ) -> Result<Self, CertifyWorkerError> {
        let response = http
            .get(discovery_url.clone())
            .query(&[("network", network)])
            .timeout(LEDGER_TIMEOUT)
            .send()
            .await?;
        let body: DiscoveryResponse = response.json().await?;
        Ok(LedgerClient {
            http,
            base_url: body.url,
            network: network.to_string(),
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}Circular_{}_{}", self.base_url, method, self.network)
    }

    #[instrument(skip(self, transaction))]
    pub async fn submit(
        &self,
        transaction: &CertificationTransaction,
    ) -> Result<SubmitResponse, CertifyWorkerError> {
        let response = self
            .http
            .post(self.endpoint("AddTransaction"))
            .json(transaction)
            .timeout(LEDGER_TIMEOUT)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(CertifyWorkerError::Rejected(format!(
                "http {}",
                response.status()
            )));
        }
        Ok(response.json().await?)
    }

    #[instrument(skip(self))]
    pub async fn get_by_id(&self, tx_id: &str) -> Result<StatusResponse, CertifyWorkerError> {
        let response = self
            .http
            .get(self.endpoint("GetTransactionByID"))
            .query(&[("TxID", tx_id)])
            .timeout(LEDGER_TIMEOUT)
            .send()
            .await?;
        Ok(response.json().await?)
    }

    #[instrument(skip(self))]
    pub async fn fetch_wallet_nonce(&self, address: &str) -> Result<u64, CertifyWorkerError> {
        #[derive(Deserialize)]
        struct NonceResponse {
            #[serde(rename = "Nonce")]
            nonce: u64,
        }
        let response = self
            .http
            .get(self.endpoint("GetWalletNonce"))
            .query(&[("Address", address)])
            .timeout(LEDGER_TIMEOUT)
            .send()
            .await?;
        let body: NonceResponse = response.json().await?;
        Ok(body.nonce)
    }
}

/// Maps the ledger's raw status literal onto the closed set §4.4 expects.
pub fn normalize_status(raw: &str) -> &'static str {
    match raw.to_ascii_lowercase().as_str() {
        "pending" => "pending",
        "verified" => "verified",
        "executed" | "confirmed" | "success" => "executed",
        _ => "failed",
    }
}
