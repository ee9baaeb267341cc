//! L3: HTTP client that submits a verified authorization to the external
//! settlement facilitator and classifies its response.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::PaymentWorkerError;
use notary402_types::payment::Authorization;

pub const FACILITATOR_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize)]
struct SettleBody<'a> {
    authorization: &'a Authorization,
    asset: &'a str,
    network: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
struct SettleResponseBody {
    success: bool,
    #[serde(rename = "txHash")]
    tx_hash: Option<String>,
    #[serde(rename = "blockNumber")]
    block_number: Option<u64>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettleOutcome {
    Settled {
        tx_hash: String,
        block_number: Option<u64>,
    },
    Pending {
        tx_hash: Option<String>,
        retry_after_secs: u64,
    },
    Failed {
        reason: String,
    },
}

pub struct FacilitatorClient {
    http: reqwest::Client,
    endpoint: url::Url,
}

impl FacilitatorClient {
    pub fn new(endpoint: url::Url) -> Self {
        let http = reqwest::Client::builder()
            .timeout(FACILITATOR_TIMEOUT)
            .build()
            .expect("facilitator http client builds");
        FacilitatorClient { http, endpoint }
    }

    #[instrument(skip_all)]
    pub async fn settle(
        &self,
        authorization: &Authorization,
        asset: &str,
        network: &str,
    ) -> Result<SettleOutcome, PaymentWorkerError> {
        let body = SettleBody {
            authorization,
            asset,
            network,
        };
        let response = match self.http.post(self.endpoint.clone()).json(&body).send().await {
            Ok(response) => response,
            Err(err) if err.is_timeout() => {
                return Ok(SettleOutcome::Pending {
                    tx_hash: None,
                    retry_after_secs: 5,
                });
            }
            Err(err) => return Err(PaymentWorkerError::Facilitator(err)),
        };

        let status = response.status();
        if status.is_server_error() {
            return Ok(SettleOutcome::Pending {
                tx_hash: None,
                retry_after_secs: 5,
            });
        }
        if status.is_client_error() {
            let body: SettleResponseBody = response.json().await.unwrap_or(SettleResponseBody {
                success: false,
                tx_hash: None,
                block_number: None,
                reason: Some(format!("http {status}")),
            });
            return Ok(SettleOutcome::Failed {
                reason: body.reason.unwrap_or_else(|| format!("http {status}")),
            });
        }

        let body: SettleResponseBody = response.json().await.map_err(PaymentWorkerError::Facilitator)?;
        if !body.success {
            return Ok(SettleOutcome::Failed {
                reason: body.reason.unwrap_or_else(|| "settlement rejected".to_string()),
            });
        }
        // A facilitator may report success before the transaction is mined:
        // a block number means the receipt is in hand, otherwise the caller
        // still needs to poll for execution before treating it as settled.
        match body.block_number {
            Some(block_number) => Ok(SettleOutcome::Settled {
                tx_hash: body.tx_hash.unwrap_or_default(),
                block_number: Some(block_number),
            }),
            None => Ok(SettleOutcome::Pending {
                tx_hash: body.tx_hash,
                retry_after_secs: 5,
            }),
        }
    }
}
