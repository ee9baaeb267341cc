//! The four operations W2 exposes over the worker RPC transport.

use notary402_types::ErrorKind;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::CertifyWorkerError;
use crate::ledger_client::{LedgerClient, normalize_status};
use crate::ledger_crypto::{
    CertificatePayload, LedgerSigner, derive_transaction_id, format_ledger_timestamp,
};

pub struct CertifyWorkerState {
    pub ledger: LedgerClient,
    pub signer: LedgerSigner,
    pub blockchain: String,
    pub explorer_url_template: String,
}

#[derive(Debug, Deserialize)]
pub struct FetchNonceParams {
    pub address: String,
}

#[instrument(skip(state))]
pub async fn fetch_wallet_nonce(
    state: &CertifyWorkerState,
    params: FetchNonceParams,
) -> Result<u64, (ErrorKind, String)> {
    with_retries(3, || state.ledger.fetch_wallet_nonce(&params.address)).await
}

async fn with_retries<F, Fut, T>(attempts: u32, mut f: F) -> Result<T, (ErrorKind, String)>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, CertifyWorkerError>>,
{
    let mut last_err = None;
    for attempt in 1..=attempts {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) if err.retriable() && attempt < attempts => {
                tracing::warn!(attempt, error = %err, "transient ledger error, retrying");
                tokio::time::sleep(std::time::Duration::from_millis(200 * attempt as u64)).await;
                last_err = Some(err);
            }
            Err(err) => return Err((err.kind(), err.to_string())),
        }
    }
    let err = last_err.expect("loop always runs at least once");
    Err((err.kind(), err.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct SubmitCertificationParams {
    pub payload_hex: String,
    pub from: String,
    pub nonce: u64,
}

#[derive(Debug, Serialize)]
pub struct SubmitCertificationResult {
    pub tx_id: String,
}

#[instrument(skip(state))]
pub async fn submit_certification(
    state: &CertifyWorkerState,
    params: SubmitCertificationParams,
) -> Result<SubmitCertificationResult, (ErrorKind, String)> {
    let payload = CertificatePayload::certificate(params.payload_hex).canonical_json();
    let timestamp = format_ledger_timestamp(chrono::Utc::now());
    let nonce_str = params.nonce.to_string();

    let client_tx_id = derive_transaction_id(
        &state.blockchain,
        &params.from,
        &params.from,
        &payload,
        &nonce_str,
        &timestamp,
    );

    let signature = state
        .signer
        .sign_transaction_id(&client_tx_id)
        .map_err(|e| (e.kind(), e.to_string()))?;

    let transaction = notary402_types::ledger::CertificationTransaction {
        blockchain: state.blockchain.clone(),
        transaction_type: notary402_types::ledger::CertificationTransaction::TRANSACTION_TYPE
            .to_string(),
        from: params.from.clone(),
        to: params.from.clone(),
        payload,
        nonce: params.nonce,
        timestamp,
        signature,
        sender_public_key: state.signer.public_key_hex(),
    };

    let response = state
        .ledger
        .submit(&transaction)
        .await
        .map_err(|e| (e.kind(), e.to_string()))?;

    // Fatal mismatch: the server's echoed id must equal the client-derived
    // one, or the submission is rejected outright (§4.4, §8.2).
    if response.tx_id != client_tx_id {
        let err = CertifyWorkerError::IdMismatch {
            client: client_tx_id,
            server: response.tx_id,
        };
        return Err((err.kind(), err.to_string()));
    }

    Ok(SubmitCertificationResult {
        tx_id: client_tx_id,
    })
}

#[derive(Debug, Deserialize)]
pub struct PollStatusParams {
    pub tx_id: String,
}

#[derive(Debug, Serialize)]
pub struct PollStatusResult {
    pub status: &'static str,
    pub block_id: Option<String>,
    pub timestamp: Option<String>,
}

#[instrument(skip(state))]
pub async fn poll_status(
    state: &CertifyWorkerState,
    params: PollStatusParams,
) -> Result<PollStatusResult, (ErrorKind, String)> {
    let response = state
        .ledger
        .get_by_id(&params.tx_id)
        .await
        .map_err(|e| (e.kind(), e.to_string()))?;
    Ok(PollStatusResult {
        status: normalize_status(&response.status),
        block_id: response.block_id,
        timestamp: response.timestamp,
    })
}

#[derive(Debug, Deserialize)]
pub struct GenerateProofParams {
    pub tx_id: String,
}

#[instrument(skip(state))]
pub async fn generate_proof(
    state: &CertifyWorkerState,
    params: GenerateProofParams,
) -> Result<notary402_types::proof::Proof, (ErrorKind, String)> {
    let response = state
        .ledger
        .get_by_id(&params.tx_id)
        .await
        .map_err(|e| (e.kind(), e.to_string()))?;

    if normalize_status(&response.status) != "executed" {
        return Err((
            ErrorKind::ErrLedgerRejected,
            "transaction is not yet executed".to_string(),
        ));
    }

    Ok(notary402_types::proof::Proof {
        tx_id: params.tx_id.clone(),
        block_id: response.block_id.unwrap_or_default(),
        timestamp: response.timestamp.unwrap_or_default(),
        explorer_url: notary402_types::proof::Proof::explorer_url(
            &state.explorer_url_template,
            &params.tx_id,
        ),
    })
}
