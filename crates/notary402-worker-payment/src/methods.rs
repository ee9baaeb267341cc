//! The four operations W1 exposes over the worker RPC transport.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, FixedBytes, TxHash, U256};
use notary402_types::payment::{Authorization, EvmAddress, HexNonce, PaymentRequirement};
use notary402_types::{ErrorKind, Network};
use notary402_ttlcache::TtlCache;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::config::NetworkConfig;
use crate::eip712::{AuthorizationFields, USDC_EIP712_NAME, USDC_EIP712_VERSION};
use crate::error::PaymentWorkerError;
use crate::evm_rpc::EvmRpcAdapter;
use crate::facilitator_client::{FacilitatorClient, SettleOutcome};

pub const SETTLEMENT_CACHE_TTL: Duration = Duration::from_secs(600);
pub const REQUIREMENT_VALIDITY: Duration = Duration::from_secs(300);

pub struct PaymentWorkerState {
    pub networks: HashMap<Network, NetworkConfig>,
    pub evm: HashMap<Network, EvmRpcAdapter>,
    pub facilitators: HashMap<Network, FacilitatorClient>,
    pub seen_nonces: TtlCache<String, ()>,
    pub settlement_cache: TtlCache<String, SettleResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettleResult {
    pub status: &'static str,
    pub tx_hash: Option<String>,
    pub block_number: Option<u64>,
    pub retry_after: Option<u64>,
}

impl PaymentWorkerState {
    pub fn new(networks: HashMap<Network, NetworkConfig>) -> Self {
        let evm = networks
            .iter()
            .map(|(network, config)| (*network, EvmRpcAdapter::connect(config.rpc_url.clone())))
            .collect();
        let facilitators = networks
            .iter()
            .map(|(network, config)| {
                (*network, FacilitatorClient::new(config.facilitator_url.clone()))
            })
            .collect();
        PaymentWorkerState {
            networks,
            evm,
            facilitators,
            seen_nonces: TtlCache::new(),
            settlement_cache: TtlCache::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateRequirementParams {
    pub amount_atomic: String,
    pub network: Network,
    pub payee: Option<String>,
    pub resource_uri: String,
    pub description: String,
}

#[instrument(skip(state))]
pub async fn create_payment_requirement(
    state: &PaymentWorkerState,
    params: CreateRequirementParams,
) -> Result<PaymentRequirement, (ErrorKind, String)> {
    let config = state
        .networks
        .get(&params.network)
        .ok_or((ErrorKind::ErrValidation, "unsupported network".to_string()))?;

    let nonce_bytes: [u8; 32] = rand::rng().random();
    let nonce = HexNonce::try_from(format!("0x{}", hex::encode(nonce_bytes)))
        .map_err(|e| (ErrorKind::ErrValidation, e.to_string()))?;

    let payee = params.payee.unwrap_or_else(|| config.payee.clone());
    let valid_until = (chrono::Utc::now() + REQUIREMENT_VALIDITY).timestamp();

    Ok(PaymentRequirement {
        x402_version: PaymentRequirement::VERSION,
        scheme: PaymentRequirement::SCHEME.to_string(),
        network: params.network,
        max_amount_required: params.amount_atomic,
        asset: EvmAddress::try_from(config.asset.clone())
            .map_err(|e| (ErrorKind::ErrValidation, e.to_string()))?,
        pay_to: EvmAddress::try_from(payee).map_err(|e| (ErrorKind::ErrValidation, e.to_string()))?,
        nonce,
        valid_until,
        resource: params.resource_uri,
        description: params.description,
    })
}

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    pub authorization: Authorization,
    pub requirement: PaymentRequirement,
}

#[derive(Debug, Serialize)]
pub struct VerifyResult {
    pub is_valid: bool,
    pub signer: Option<String>,
    pub error: Option<&'static str>,
}

fn parse_address(value: &str) -> Result<Address, PaymentWorkerError> {
    value
        .parse::<Address>()
        .map_err(|e| PaymentWorkerError::Malformed(e.to_string()))
}

fn parse_u256(value: &str) -> Result<U256, PaymentWorkerError> {
    U256::from_str_radix(value, 10).map_err(|e| PaymentWorkerError::Malformed(e.to_string()))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

fn parse_hex32(value: &str) -> Result<FixedBytes<32>, PaymentWorkerError> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    let bytes = hex::decode(stripped).map_err(|e| PaymentWorkerError::Malformed(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(PaymentWorkerError::Malformed("expected 32 bytes".to_string()));
    }
    Ok(FixedBytes::<32>::from_slice(&bytes))
}

/// Validates an authorization against a requirement with constant-time
/// address comparison and no early-exit that would leak which signature
/// component failed (§4.5: "do not early-exit... in a way that an observer
/// could distinguish 'bad r' from 'bad s'").
#[instrument(skip(state))]
pub async fn verify_payment(
    state: &PaymentWorkerState,
    params: VerifyParams,
) -> Result<VerifyResult, (ErrorKind, String)> {
    let result = verify_payment_inner(state, &params).await;
    match result {
        Ok(signer) => Ok(VerifyResult {
            is_valid: true,
            signer: Some(format!("{signer:#x}")),
            error: None,
        }),
        Err(err) => Ok(VerifyResult {
            is_valid: false,
            signer: None,
            error: Some(err.reason()),
        }),
    }
}

async fn verify_payment_inner(
    state: &PaymentWorkerState,
    params: &VerifyParams,
) -> Result<Address, PaymentWorkerError> {
    let authorization = &params.authorization;
    let requirement = &params.requirement;

    if authorization.to.as_str().to_lowercase() != requirement.pay_to.as_str().to_lowercase() {
        return Err(PaymentWorkerError::RecipientMismatch);
    }
    if requirement.asset.as_str().to_lowercase() != state
        .networks
        .get(&requirement.network)
        .map(|c| c.asset.to_lowercase())
        .unwrap_or_default()
    {
        return Err(PaymentWorkerError::AssetMismatch);
    }

    let now = chrono::Utc::now().timestamp();
    if !(authorization.valid_after <= now && now < authorization.valid_before) {
        return Err(PaymentWorkerError::InvalidTiming);
    }

    let value = parse_u256(&authorization.value)?;
    let required = parse_u256(&requirement.max_amount_required)?;
    if value != required {
        return Err(PaymentWorkerError::AmountMismatch);
    }

    if state
        .seen_nonces
        .contains_fresh(&authorization.nonce.as_str().to_string())
    {
        return Err(PaymentWorkerError::DuplicateNonce);
    }

    let fields = AuthorizationFields {
        from: parse_address(authorization.from.as_str())?,
        to: parse_address(authorization.to.as_str())?,
        value,
        valid_after: U256::from(authorization.valid_after.max(0) as u64),
        valid_before: U256::from(authorization.valid_before.max(0) as u64),
        nonce: parse_hex32(authorization.nonce.as_str())?,
    };
    let asset_address = parse_address(requirement.asset.as_str())?;
    let r = parse_hex32(authorization.r.as_str())?.0;
    let s = parse_hex32(authorization.s.as_str())?.0;

    let recovered = crate::eip712::recover_signer(
        &fields,
        asset_address,
        requirement.network.chain_id(),
        authorization.v,
        r,
        s,
    )?;
    let expected = parse_address(authorization.from.as_str())?;

    // Constant-time comparison so a byte-by-byte early return on address
    // bytes can't be used to distinguish near-miss recoveries.
    if constant_time_eq(recovered.as_slice(), expected.as_slice()) {
        state
            .seen_nonces
            .insert(authorization.nonce.as_str().to_string(), (), Duration::from_secs(3600));
        Ok(recovered)
    } else {
        Err(PaymentWorkerError::InvalidSignature(
            "recovered signer does not match claimed payer".to_string(),
        ))
    }
}

#[derive(Debug, Deserialize)]
pub struct SettleParams {
    pub authorization: Authorization,
    pub requirement: PaymentRequirement,
}

#[instrument(skip(state))]
pub async fn settle_payment(
    state: &PaymentWorkerState,
    params: SettleParams,
) -> Result<SettleResult, (ErrorKind, String)> {
    let nonce_key = params.authorization.nonce.as_str().to_string();
    if let Some(cached) = state.settlement_cache.get(&nonce_key) {
        return Ok(cached);
    }

    let facilitator = state
        .facilitators
        .get(&params.requirement.network)
        .ok_or((ErrorKind::ErrValidation, "unsupported network".to_string()))?;

    let outcome = facilitator
        .settle(
            &params.authorization,
            params.requirement.asset.as_str(),
            &params.requirement.network.to_string(),
        )
        .await
        .map_err(|e| (e.kind(), e.to_string()))?;

    let result = match outcome {
        SettleOutcome::Settled { tx_hash, block_number } => SettleResult {
            status: "settled",
            tx_hash: Some(tx_hash),
            block_number,
            retry_after: None,
        },
        SettleOutcome::Pending { tx_hash, retry_after_secs } => SettleResult {
            status: "pending",
            tx_hash,
            block_number: None,
            retry_after: Some(retry_after_secs),
        },
        SettleOutcome::Failed { reason } => {
            return Err((ErrorKind::ErrSettlementFailed, reason));
        }
    };

    // A `pending` outcome isn't final: cache it only for its own retry
    // window so a caller that re-submits shortly after still reaches the
    // facilitator once that window has passed, instead of replaying a
    // stale classification for the full settlement TTL.
    let cache_ttl = match result.retry_after {
        Some(secs) => Duration::from_secs(secs),
        None => SETTLEMENT_CACHE_TTL,
    };
    state.settlement_cache.insert(nonce_key, result.clone(), cache_ttl);
    Ok(result)
}

#[derive(Debug, Deserialize)]
pub struct ConfirmSettlementParams {
    pub network: Network,
    pub tx_hash: String,
}

#[derive(Debug, Serialize)]
pub struct ConfirmSettlementResult {
    pub confirmed: bool,
}

/// Confirms a `pending` settlement by polling for its receipt (L2). Called
/// in a loop by the orchestrator while a settlement is pending with a known
/// transaction hash but no confirmed block yet.
#[instrument(skip(state))]
pub async fn confirm_settlement(
    state: &PaymentWorkerState,
    params: ConfirmSettlementParams,
) -> Result<ConfirmSettlementResult, (ErrorKind, String)> {
    let adapter = state
        .evm
        .get(&params.network)
        .ok_or((ErrorKind::ErrValidation, "unsupported network".to_string()))?;
    let hash: TxHash = params
        .tx_hash
        .parse()
        .map_err(|_| (ErrorKind::ErrValidation, "malformed tx hash".to_string()))?;
    let receipt = adapter
        .get_receipt(hash)
        .await
        .map_err(|e| (e.kind(), e.to_string()))?;
    Ok(ConfirmSettlementResult {
        confirmed: receipt.map(|r| r.status()).unwrap_or(false),
    })
}

#[derive(Debug, Deserialize)]
pub struct EncodeParams {
    pub requirement: PaymentRequirement,
}

#[derive(Debug, Serialize)]
pub struct EncodeResult {
    pub eip681: String,
    pub deep_link: String,
}

#[instrument(skip_all)]
pub async fn encode_payment_uri(params: EncodeParams) -> Result<EncodeResult, (ErrorKind, String)> {
    let requirement = &params.requirement;
    let chain_id = requirement.network.chain_id();
    Ok(EncodeResult {
        eip681: notary402_types::wallet_uri::eip681_uri(
            requirement.asset.as_str(),
            chain_id,
            requirement.pay_to.as_str(),
            &requirement.max_amount_required,
        ),
        deep_link: notary402_types::wallet_uri::metamask_deep_link(
            requirement.asset.as_str(),
            chain_id,
            requirement.pay_to.as_str(),
            &requirement.max_amount_required,
        ),
    })
}

pub type Shared = Arc<PaymentWorkerState>;
