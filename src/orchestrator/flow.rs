//! The public contract of §4.1: `handle_submission`, `handle_payment`,
//! `handle_status_query`, and the certification sub-flow they kick off.

use base64::Engine;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::json;
use sha2::{Digest, Sha256};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use notary402_types::error::ErrorBody;
use notary402_types::network::Network;
use notary402_types::payment::{Authorization, PaymentRequirement};
use notary402_types::proof::Proof;
use notary402_types::request::{
    Certification, CertificationStatus, ClientModality, PaymentStatus, Request, RequestState,
};

use crate::db::models::NewRequest;
use crate::orchestrator::state::{
    AppState, CERTIFICATION_POLL_BUDGET, CERTIFICATION_POLL_INTERVAL, ENCODE_CALL_DEADLINE,
    LEDGER_CALL_DEADLINE, OrchestratorError, PAYMENT_CALL_DEADLINE, PRICING_CALL_DEADLINE,
    SETTLEMENT_CONFIRM_POLL_BUDGET, SETTLEMENT_CONFIRM_POLL_INTERVAL,
};

pub const MAX_REQUEST_BYTES: usize = 10 * 1024 * 1024;
const STABLECOIN_DECIMALS: u32 = 6;

#[derive(Debug, Serialize)]
pub struct QuoteView {
    pub usdc_amount: Decimal,
    pub cirx_fee: Decimal,
    pub cirx_price_usd: Decimal,
    pub valid_until: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
pub struct PaymentRequiredBody {
    pub quote: QuoteView,
    pub payment: PaymentRequirement,
    pub payment_options: serde_json::Value,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    PaymentRequired(PaymentRequiredBody),
    Accepted { status_url: String },
    Completed { proof: Proof },
    Failed { error: ErrorBody },
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PaymentOutcome {
    Completed { proof: Proof },
    Accepted { status_url: String },
}

fn status_url(external_id: &str) -> String {
    format!("/v1/status/{external_id}")
}

async fn cached_terminal_outcome(
    state: &AppState,
    request: &Request,
    certification: Option<&Certification>,
) -> SubmissionOutcome {
    match (request.state, certification) {
        (RequestState::Completed, Some(certification)) => match fetch_proof(state, certification).await {
            Ok(proof) => SubmissionOutcome::Completed { proof },
            Err(err) => SubmissionOutcome::Failed {
                error: ErrorBody::new(err.kind(), err.to_string()),
            },
        },
        _ => SubmissionOutcome::Failed {
            error: ErrorBody::new(notary402_types::ErrorKind::ErrValidation, "request failed"),
        },
    }
}

/// Regenerates the proof tuple for an already-confirmed certification;
/// stateless on the worker side, so safe to call on every cache hit.
async fn fetch_proof(state: &AppState, certification: &Certification) -> Result<Proof, OrchestratorError> {
    let proof_result = state
        .workers
        .certify
        .call(
            "generate_proof",
            json!({ "tx_id": certification.tx_id }),
            LEDGER_CALL_DEADLINE,
        )
        .await
        .map_err(OrchestratorError::from)?;
    serde_json::from_value(proof_result)
        .map_err(|e| OrchestratorError::new(notary402_types::ErrorKind::ErrDependency, e.to_string()))
}

/// §4.1's `handle_submission`, combined with the 402 payload construction of
/// §6: quotes the request, generates its payment requirement, and persists
/// the `quoted → payment_pending` transitions before returning.
#[instrument(skip(state, bytes))]
pub async fn handle_submission(
    state: &AppState,
    external_id: &str,
    client_id: &str,
    bytes: &[u8],
    network: Network,
    modality: ClientModality,
    callback_url: Option<String>,
) -> Result<SubmissionOutcome, OrchestratorError> {
    if bytes.len() > MAX_REQUEST_BYTES {
        return Err(OrchestratorError::new(
            notary402_types::ErrorKind::ErrValidation,
            format!("payload of {} bytes exceeds the 10 MiB limit", bytes.len()),
        ));
    }

    match state.repo.get_request_by_external_id(external_id).await {
        Ok(existing) => {
            if existing.state.is_terminal() {
                let certification = state
                    .repo
                    .get_certification_by_request_id(existing.id)
                    .await
                    .ok()
                    .flatten();
                return Ok(cached_terminal_outcome(state, &existing, certification.as_ref()).await);
            }
            return Ok(SubmissionOutcome::Accepted {
                status_url: status_url(external_id),
            });
        }
        Err(crate::db::RepoError::NotFound) => {}
        Err(err) => return Err(err.into()),
    }

    let content_hash_hex = hex::encode(Sha256::digest(bytes));

    let request = state
        .repo
        .create_request(NewRequest {
            external_id: external_id.to_string(),
            client_id: client_id.to_string(),
            content_hash_hex,
            byte_size: bytes.len() as i64,
            network,
            modality,
            callback_url,
        })
        .await?;

    let price_result = state
        .workers
        .pricing
        .call("price", json!({}), PRICING_CALL_DEADLINE)
        .await
        .map_err(OrchestratorError::from)?;
    let price: notary402_types::quote::PriceQuote =
        serde_json::from_value(price_result).map_err(|e| {
            OrchestratorError::new(notary402_types::ErrorKind::ErrDependency, e.to_string())
        })?;

    let quote_result = state
        .workers
        .pricing
        .call(
            "quote",
            json!({ "bytes": request.byte_size, "price": price.price }),
            PRICING_CALL_DEADLINE,
        )
        .await
        .map_err(OrchestratorError::from)?;
    let quote: notary402_types::quote::Quote = serde_json::from_value(quote_result).map_err(|e| {
        OrchestratorError::new(notary402_types::ErrorKind::ErrDependency, e.to_string())
    })?;

    let request = state
        .repo
        .set_quote(
            request.id,
            request.version,
            quote.usdc_amount,
            quote.cirx_fee,
            quote.cirx_price_usd,
            quote.valid_until,
        )
        .await?;

    let amount_atomic = notary402_types::money::to_atomic_units(quote.usdc_amount, STABLECOIN_DECIMALS)
        .ok_or_else(|| {
            OrchestratorError::new(
                notary402_types::ErrorKind::ErrValidation,
                "quote amount does not fit atomic units",
            )
        })?
        .to_string();

    let requirement_result = state
        .workers
        .payment
        .call(
            "create_payment_requirement",
            json!({
                "amount_atomic": amount_atomic,
                "network": request.network,
                "payee": null,
                "resource_uri": format!("urn:notary402:request:{external_id}"),
                "description": format!("certification of {} bytes", request.byte_size),
            }),
            PAYMENT_CALL_DEADLINE,
        )
        .await
        .map_err(OrchestratorError::from)?;
    let requirement: PaymentRequirement = serde_json::from_value(requirement_result).map_err(|e| {
        OrchestratorError::new(notary402_types::ErrorKind::ErrDependency, e.to_string())
    })?;

    let request = state
        .repo
        .set_payment_requirement(request.id, request.version, &requirement)
        .await?;

    let options_result = state
        .workers
        .encode
        .call(
            "encode_payment_options",
            json!({ "requirement": requirement }),
            ENCODE_CALL_DEADLINE,
        )
        .await
        .map_err(OrchestratorError::from)?;

    info!(request_id = %request.id, "quoted and issued payment requirement");

    Ok(SubmissionOutcome::PaymentRequired(PaymentRequiredBody {
        quote: QuoteView {
            usdc_amount: quote.usdc_amount,
            cirx_fee: quote.cirx_fee,
            cirx_price_usd: quote.cirx_price_usd,
            valid_until: quote.valid_until,
        },
        payment: requirement,
        payment_options: options_result,
    }))
}

/// §4.1's `handle_payment`: verifies, settles, persists the Payment row,
/// then spawns the certification sub-flow and returns `Accepted`.
#[instrument(skip(state, authorization_b64))]
pub async fn handle_payment(
    state: &AppState,
    external_id: &str,
    authorization_b64: &str,
) -> Result<PaymentOutcome, OrchestratorError> {
    let request = state.repo.get_request_by_external_id(external_id).await?;

    if request.state.is_terminal() {
        return match request.state {
            RequestState::Completed => {
                let certification = state
                    .repo
                    .get_certification_by_request_id(request.id)
                    .await?
                    .ok_or_else(|| {
                        OrchestratorError::new(
                            notary402_types::ErrorKind::ErrValidation,
                            "completed request has no certification record",
                        )
                    })?;
                let proof = fetch_proof(state, &certification).await?;
                Ok(PaymentOutcome::Completed { proof })
            }
            _ => Err(OrchestratorError::new(
                notary402_types::ErrorKind::ErrStateConflict,
                "request already failed",
            )),
        };
    }

    if !matches!(request.state, RequestState::PaymentPending) {
        return Ok(PaymentOutcome::Accepted {
            status_url: status_url(external_id),
        });
    }

    let requirement = request.payment_requirement.clone().ok_or_else(|| {
        OrchestratorError::new(
            notary402_types::ErrorKind::ErrValidation,
            "request has no payment requirement to validate against",
        )
    })?;
    if let Some(expires_at) = request.quote_expires_at {
        if chrono::Utc::now() > expires_at {
            return Err(OrchestratorError::new(
                notary402_types::ErrorKind::ErrQuoteExpired,
                "quote has expired",
            ));
        }
    }

    let decoded = base64::engine::general_purpose::STANDARD
        .decode(authorization_b64)
        .map_err(|e| OrchestratorError::new(notary402_types::ErrorKind::ErrValidation, e.to_string()))?;
    let authorization: Authorization = serde_json::from_slice(&decoded).map_err(|e| {
        OrchestratorError::new(notary402_types::ErrorKind::ErrValidation, e.to_string())
    })?;

    if let Some(existing) = state
        .repo
        .get_payment_by_nonce(authorization.nonce.as_str())
        .await?
    {
        if existing.status == PaymentStatus::Settled {
            return Ok(PaymentOutcome::Accepted {
                status_url: status_url(external_id),
            });
        }
        return Err(OrchestratorError::new(
            notary402_types::ErrorKind::ErrDuplicateNonce,
            "authorization nonce already in use",
        ));
    }

    let verify_result = state
        .workers
        .payment
        .call(
            "verify_payment",
            json!({ "authorization": authorization, "requirement": requirement }),
            PAYMENT_CALL_DEADLINE,
        )
        .await
        .map_err(OrchestratorError::from)?;
    let verify: VerifyResult = serde_json::from_value(verify_result)
        .map_err(|e| OrchestratorError::new(notary402_types::ErrorKind::ErrDependency, e.to_string()))?;

    if !verify.is_valid {
        return Err(OrchestratorError::new(
            notary402_types::ErrorKind::ErrBadAuthorization,
            verify.error.unwrap_or("invalid authorization"),
        ));
    }

    let request = state
        .repo
        .advance_state(request.id, request.version, RequestState::PaymentVerified)
        .await?;

    // A verified Payment row exists before settlement is even attempted, so
    // the record reflects the true on-chain outcome rather than a status
    // that's never revisited.
    let payment = state
        .repo
        .insert_payment(
            request.id,
            authorization.nonce.as_str(),
            authorization.from.as_str(),
            authorization.to.as_str(),
            &authorization.value,
            request.network,
            PaymentStatus::Verified,
            serde_json::to_value(&authorization).expect("Authorization always serializes"),
        )
        .await?;

    let settle_result = state
        .workers
        .payment
        .call(
            "settle_payment",
            json!({ "authorization": authorization, "requirement": requirement }),
            PAYMENT_CALL_DEADLINE,
        )
        .await
        .map_err(OrchestratorError::from)?;
    let settle: SettleResult = serde_json::from_value(settle_result)
        .map_err(|e| OrchestratorError::new(notary402_types::ErrorKind::ErrDependency, e.to_string()))?;

    let settle = match settle.status.as_str() {
        "failed" => {
            state
                .repo
                .update_payment_status(payment.id, PaymentStatus::Failed, None)
                .await?;
            return Err(OrchestratorError::new(
                notary402_types::ErrorKind::ErrSettlementFailed,
                "settlement rejected",
            ));
        }
        "settled" => settle,
        _ => await_settlement_confirmation(state, request.network, &authorization, &requirement, settle).await?,
    };
    if settle.status != "settled" {
        state
            .repo
            .update_payment_status(payment.id, PaymentStatus::Failed, None)
            .await?;
        return Err(OrchestratorError::new(
            notary402_types::ErrorKind::ErrSettlementFailed,
            "settlement did not confirm within the poll budget",
        ));
    }

    state
        .repo
        .update_payment_status(payment.id, PaymentStatus::Settled, settle.tx_hash.as_deref())
        .await?;

    let request = state
        .repo
        .advance_state(request.id, request.version, RequestState::PaymentSettled)
        .await?;

    let app_state = state.clone();
    let request_id = request.id;
    tokio::spawn(async move {
        if let Err(err) = run_certification(&app_state, request_id).await {
            error!(request_id = %request_id, error = %err, "certification sub-flow failed");
        }
    });

    Ok(PaymentOutcome::Accepted {
        status_url: status_url(external_id),
    })
}

/// Resolves a `pending` settlement into a terminal one (§4.1 step 4):
/// polls the chain receipt when a transaction hash is already known, or
/// re-asks the facilitator when it isn't. Gives up at the poll budget and
/// returns the settlement unresolved, which the caller treats as a failed
/// attempt rather than advancing the Request.
async fn await_settlement_confirmation(
    state: &AppState,
    network: Network,
    authorization: &Authorization,
    requirement: &PaymentRequirement,
    mut settle: SettleResult,
) -> Result<SettleResult, OrchestratorError> {
    let deadline = tokio::time::Instant::now() + SETTLEMENT_CONFIRM_POLL_BUDGET;

    while settle.status != "settled" {
        if tokio::time::Instant::now() >= deadline {
            return Ok(settle);
        }
        tokio::time::sleep(SETTLEMENT_CONFIRM_POLL_INTERVAL).await;

        match settle.tx_hash.clone() {
            Some(tx_hash) => {
                let confirm_result = state
                    .workers
                    .payment
                    .call(
                        "confirm_settlement",
                        json!({ "network": network, "tx_hash": tx_hash }),
                        PAYMENT_CALL_DEADLINE,
                    )
                    .await
                    .map_err(OrchestratorError::from)?;
                let confirm: ConfirmSettlementResult = serde_json::from_value(confirm_result).map_err(|e| {
                    OrchestratorError::new(notary402_types::ErrorKind::ErrDependency, e.to_string())
                })?;
                if confirm.confirmed {
                    settle.status = "settled".to_string();
                }
            }
            None => {
                let settle_result = state
                    .workers
                    .payment
                    .call(
                        "settle_payment",
                        json!({ "authorization": authorization, "requirement": requirement }),
                        PAYMENT_CALL_DEADLINE,
                    )
                    .await
                    .map_err(OrchestratorError::from)?;
                // `settle_payment` raises ErrSettlementFailed directly on a
                // facilitator rejection, so any value returned here is
                // "settled" or still "pending".
                settle = serde_json::from_value(settle_result).map_err(|e| {
                    OrchestratorError::new(notary402_types::ErrorKind::ErrDependency, e.to_string())
                })?;
            }
        }
    }

    Ok(settle)
}

#[derive(Debug, serde::Deserialize)]
struct ConfirmSettlementResult {
    confirmed: bool,
}

#[derive(Debug, serde::Deserialize)]
pub struct VerifyResult {
    pub is_valid: bool,
    pub signer: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
pub struct SettleResult {
    pub status: String,
    pub tx_hash: Option<String>,
    pub block_number: Option<u64>,
    pub retry_after: Option<u64>,
}

/// The certification sub-flow of §4.1: fetch nonce, submit, poll, generate
/// proof. Runs after payment settles; leaves a `submitted`/`pending`
/// Certification row for the retry queue (O4) to pick up if the poll budget
/// expires before a terminal status is reached.
#[instrument(skip(state))]
pub async fn run_certification(state: &AppState, request_id: Uuid) -> Result<(), OrchestratorError> {
    let request = state.repo.get_request(request_id).await?;
    let request = state
        .repo
        .advance_state(request.id, request.version, RequestState::Certifying)
        .await?;

    let certification = submit_certification_attempt(state, request.id, &request.content_hash_hex, 0).await?;

    poll_certification_to_completion(state, request.id, certification).await
}

/// Fetches a fresh wallet nonce and submits a certification transaction for
/// `content_hash_hex`, inserting a new Certification row (append-on-attempt,
/// §3). Shared by the initial sub-flow and the retry queue (O4), since a
/// retry is "fetch a fresh nonce, resubmit" per §4.2, not a re-poll of the
/// same transaction id.
#[instrument(skip(state, content_hash_hex))]
pub async fn submit_certification_attempt(
    state: &AppState,
    request_id: Uuid,
    content_hash_hex: &str,
    retry_count: u32,
) -> Result<Certification, OrchestratorError> {
    let wallet_address = &state.config.cli.ledger_wallet_address;

    let nonce_result = state
        .workers
        .certify
        .call(
            "fetch_wallet_nonce",
            json!({ "address": wallet_address }),
            LEDGER_CALL_DEADLINE,
        )
        .await
        .map_err(OrchestratorError::from)?;
    let nonce: u64 = serde_json::from_value(nonce_result).map_err(|e| {
        OrchestratorError::new(notary402_types::ErrorKind::ErrDependency, e.to_string())
    })?;

    let submit_result = state
        .workers
        .certify
        .call(
            "submit_certification",
            json!({
                "payload_hex": format!("0x{content_hash_hex}"),
                "from": wallet_address,
                "nonce": nonce,
            }),
            LEDGER_CALL_DEADLINE,
        )
        .await
        .map_err(OrchestratorError::from)?;
    let submitted: SubmitResult = serde_json::from_value(submit_result).map_err(|e| {
        OrchestratorError::new(notary402_types::ErrorKind::ErrDependency, e.to_string())
    })?;

    let certification = state
        .repo
        .insert_certification(request_id, &submitted.tx_id)
        .await?;
    let certification = state
        .repo
        .update_certification(
            certification.id,
            CertificationStatus::Submitted,
            None,
            None,
            retry_count,
            false,
            None,
        )
        .await?;
    Ok(certification)
}

#[derive(Debug, serde::Deserialize)]
struct SubmitResult {
    tx_id: String,
}

/// Startup recovery for the crash window between a worker's successful
/// `submit_certification_attempt` and the `insert_certification` write: a
/// Request left in `certifying` with no Certification row is invisible to
/// the retry queue, so it's re-entered into the certification sub-flow here
/// instead (§3's "tolerates restart" requirement).
pub async fn reconcile_orphaned_certifications(state: &AppState) -> Result<usize, OrchestratorError> {
    let orphaned = state.repo.list_orphaned_certifying_requests().await?;
    let count = orphaned.len();
    for request in orphaned {
        warn!(request_id = %request.id, "found certifying request with no certification row, resubmitting");
        let app_state = state.clone();
        let request_id = request.id;
        tokio::spawn(async move {
            if let Err(err) = run_certification(&app_state, request_id).await {
                error!(request_id = %request_id, error = %err, "orphaned certification recovery failed");
            }
        });
    }
    Ok(count)
}

/// Polls at a fixed 5s interval up to a 60s budget (§4.1 step 5). If the
/// budget is exhausted without a terminal status, the Certification row is
/// left `submitted` for the retry queue to resume.
pub async fn poll_certification_to_completion(
    state: &AppState,
    request_id: Uuid,
    mut certification: Certification,
) -> Result<(), OrchestratorError> {
    let deadline = tokio::time::Instant::now() + CERTIFICATION_POLL_BUDGET;

    loop {
        let poll_result = state
            .workers
            .certify
            .call(
                "poll_status",
                json!({ "tx_id": certification.tx_id }),
                LEDGER_CALL_DEADLINE,
            )
            .await
            .map_err(OrchestratorError::from)?;
        let status: PollResult = serde_json::from_value(poll_result).map_err(|e| {
            OrchestratorError::new(notary402_types::ErrorKind::ErrDependency, e.to_string())
        })?;

        match status.status.as_str() {
            "executed" => {
                return complete_certification(state, request_id, certification).await;
            }
            "failed" => {
                certification = state
                    .repo
                    .update_certification(
                        certification.id,
                        CertificationStatus::Failed,
                        status.block_id.as_deref(),
                        None,
                        certification.retry_count,
                        false,
                        Some("ledger reported failed status"),
                    )
                    .await?;
                let request = state.repo.get_request(request_id).await?;
                state
                    .repo
                    .advance_state(request.id, request.version, RequestState::Failed)
                    .await?;
                return Err(OrchestratorError::new(
                    notary402_types::ErrorKind::ErrLedgerRejected,
                    "certification transaction rejected by ledger",
                ));
            }
            _ => {
                if tokio::time::Instant::now() >= deadline {
                    warn!(request_id = %request_id, tx_id = %certification.tx_id, "certification poll budget exhausted, handing off to retry queue");
                    return Ok(());
                }
                tokio::time::sleep(CERTIFICATION_POLL_INTERVAL).await;
            }
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct PollResult {
    status: String,
    block_id: Option<String>,
    #[allow(dead_code)]
    timestamp: Option<String>,
}

async fn complete_certification(
    state: &AppState,
    request_id: Uuid,
    certification: Certification,
) -> Result<(), OrchestratorError> {
    let proof = fetch_proof(state, &certification).await?;

    state
        .repo
        .update_certification(
            certification.id,
            CertificationStatus::Confirmed,
            Some(&proof.block_id),
            None,
            certification.retry_count,
            false,
            None,
        )
        .await?;

    let request = state.repo.get_request(request_id).await?;
    state
        .repo
        .advance_state(request.id, request.version, RequestState::Completed)
        .await?;

    info!(request_id = %request_id, tx_id = %proof.tx_id, "certification completed");

    crate::webhook::dispatch_if_configured(state, request_id, &proof).await;

    Ok(())
}

#[derive(Debug, Serialize)]
pub struct StatusSnapshot {
    pub status: RequestState,
    pub payment: Option<notary402_types::request::Payment>,
    pub certification: Option<Certification>,
    pub error: Option<ErrorBody>,
}

/// §4.1's `handle_status_query`.
#[instrument(skip(state))]
pub async fn handle_status_query(
    state: &AppState,
    external_id: &str,
) -> Result<StatusSnapshot, OrchestratorError> {
    let request = state.repo.get_request_by_external_id(external_id).await?;
    let payment = request
        .payment_requirement
        .as_ref()
        .and_then(|r| state_nonce_lookup(r));
    let payment = match payment {
        Some(nonce) => state.repo.get_payment_by_nonce(&nonce).await?,
        None => None,
    };
    let certification = state
        .repo
        .get_certification_by_request_id(request.id)
        .await
        .ok()
        .flatten();

    let error = if request.state == RequestState::Failed {
        Some(ErrorBody::new(
            notary402_types::ErrorKind::ErrLedgerRejected,
            "request failed",
        ))
    } else {
        None
    };

    Ok(StatusSnapshot {
        status: request.state,
        payment,
        certification,
        error,
    })
}

fn state_nonce_lookup(requirement: &PaymentRequirement) -> Option<String> {
    Some(requirement.nonce.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notary402_types::payment::{EvmAddress, HexNonce};

    fn sample_requirement() -> PaymentRequirement {
        PaymentRequirement {
            x402_version: PaymentRequirement::VERSION,
            scheme: PaymentRequirement::SCHEME.to_string(),
            network: Network::Base,
            max_amount_required: "30000".to_string(),
            asset: EvmAddress::try_from("0x".to_string() + &"11".repeat(20)).unwrap(),
            pay_to: EvmAddress::try_from("0x".to_string() + &"22".repeat(20)).unwrap(),
            nonce: HexNonce::try_from("0x".to_string() + &"33".repeat(32)).unwrap(),
            valid_until: 0,
            resource: "https://example.com/r".to_string(),
            description: "certification".to_string(),
        }
    }

    #[test]
    fn status_url_points_at_the_status_endpoint() {
        assert_eq!(status_url("ext-1"), "/v1/status/ext-1");
    }

    #[test]
    fn state_nonce_lookup_extracts_the_requirement_nonce() {
        let requirement = sample_requirement();
        let nonce = state_nonce_lookup(&requirement).unwrap();
        assert_eq!(nonce, "0x".to_string() + &"33".repeat(32));
    }

    #[test]
    fn submission_outcome_tags_payment_required_for_serialization() {
        let outcome = SubmissionOutcome::PaymentRequired(PaymentRequiredBody {
            quote: QuoteView {
                usdc_amount: Decimal::new(3, 2),
                cirx_fee: Decimal::new(176, 4),
                cirx_price_usd: Decimal::new(44, 4),
                valid_until: chrono::Utc::now(),
            },
            payment: sample_requirement(),
            payment_options: serde_json::json!({}),
        });
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["outcome"], "payment_required");
    }
}
