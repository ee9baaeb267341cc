//! L2: read-only EVM JSON-RPC adapter used to confirm settlements the
//! facilitator reported as `pending`. Bounded retry: 3 attempts, 3s each.

use std::time::Duration;

use alloy_primitives::{Address, TxHash};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types_eth::TransactionReceipt;
use tracing::{instrument, warn};

use crate::error::PaymentWorkerError;

pub const RPC_CALL_TIMEOUT: Duration = Duration::from_secs(3);
pub const RPC_MAX_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct EvmRpcAdapter {
    provider: alloy_provider::RootProvider,
}

impl EvmRpcAdapter {
    pub fn connect(rpc_url: url::Url) -> Self {
        let provider = ProviderBuilder::new().connect_http(rpc_url);
        EvmRpcAdapter { provider }
    }

    /// Polls for a transaction receipt, retrying transient errors up to
    /// [`RPC_MAX_ATTEMPTS`] times with a fixed per-attempt timeout.
    #[instrument(skip(self))]
    pub async fn get_receipt(
        &self,
        tx_hash: TxHash,
    ) -> Result<Option<TransactionReceipt>, PaymentWorkerError> {
        let mut last_err = None;
        for attempt in 1..=RPC_MAX_ATTEMPTS {
            match tokio::time::timeout(RPC_CALL_TIMEOUT, self.provider.get_transaction_receipt(tx_hash)).await
            {
                Ok(Ok(receipt)) => return Ok(receipt),
                Ok(Err(err)) => {
                    warn!(attempt, error = %err, "evm rpc call failed");
                    last_err = Some(err.to_string());
                }
                Err(_) => {
                    warn!(attempt, "evm rpc call timed out");
                    last_err = Some("timeout".to_string());
                }
            }
        }
        Err(PaymentWorkerError::Rpc(last_err.unwrap_or_default()))
    }

    /// Pending-block transaction count; used only to support higher-level
    /// on-chain diagnostics, never as the authorization's own nonce (that
    /// nonce is random and unrelated to on-chain transaction count, §4.5).
    #[instrument(skip(self))]
    pub async fn pending_transaction_count(
        &self,
        address: Address,
    ) -> Result<u64, PaymentWorkerError> {
        let mut last_err = None;
        for attempt in 1..=RPC_MAX_ATTEMPTS {
            match tokio::time::timeout(
                RPC_CALL_TIMEOUT,
                self.provider.get_transaction_count(address).pending(),
            )
            .await
            {
                Ok(Ok(count)) => return Ok(count),
                Ok(Err(err)) => {
                    warn!(attempt, error = %err, "evm rpc call failed");
                    last_err = Some(err.to_string());
                }
                Err(_) => {
                    warn!(attempt, "evm rpc call timed out");
                    last_err = Some("timeout".to_string());
                }
            }
        }
        Err(PaymentWorkerError::Rpc(last_err.unwrap_or_default()))
    }
}
