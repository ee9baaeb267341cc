//! The data model of §3: Request, Payment, Certification, WalletBalance.
//!
//! These are the in-memory shapes the persistence layer loads rows into;
//! they carry no database-specific code so the orchestrator's `db` module
//! and the workers can share them without either depending on `sqlx`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::network::Network;
use crate::payment::PaymentRequirement;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientModality {
    Agent,
    Browser,
    Mobile,
}

/// The states of §4.1, ordered. `Failed` is a parallel terminal reachable
/// from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    Initiated,
    Quoted,
    PaymentPending,
    PaymentVerified,
    PaymentSettled,
    Certifying,
    Completed,
    Failed,
}

impl RequestState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestState::Completed | RequestState::Failed)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: uuid::Uuid,
    pub external_id: String,
    pub client_id: String,
    pub content_hash_hex: String,
    pub byte_size: u64,
    pub state: RequestState,
    /// The EVM settlement network chosen at submission time; fixed for the
    /// lifetime of the Request (§3 lists it alongside the quote fields).
    pub network: Network,
    pub quote_usdc_amount: Option<rust_decimal::Decimal>,
    pub quote_ledger_fee: Option<rust_decimal::Decimal>,
    pub quote_oracle_price: Option<rust_decimal::Decimal>,
    pub quote_expires_at: Option<DateTime<Utc>>,
    /// The exact requirement handed to the client in the 402 response,
    /// persisted so `handle_payment` can re-validate an authorization
    /// against the same nonce/amount/payee it was quoted (§4.5).
    pub payment_requirement: Option<PaymentRequirement>,
    pub callback_url: Option<String>,
    pub modality: ClientModality,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Row version used as the orchestrator's optimistic lease (§4.1,
    /// "row update with version check").
    pub version: i64,
    /// Best-effort webhook delivery outcome (§4.3); `None` until a callback
    /// URL's dispatch has been attempted.
    pub webhook_delivered: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Verified,
    Settled,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: uuid::Uuid,
    pub request_id: uuid::Uuid,
    pub nonce: String,
    pub payer: String,
    pub payee: String,
    pub atomic_amount: String,
    pub network: crate::network::Network,
    pub settlement_tx_hash: Option<String>,
    pub status: PaymentStatus,
    pub authorization_blob: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificationStatus {
    Pending,
    Submitted,
    Confirmed,
    Failed,
}

pub const CERTIFICATION_MAX_RETRIES: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Certification {
    pub id: uuid::Uuid,
    pub request_id: uuid::Uuid,
    pub tx_id: String,
    pub block_id: Option<String>,
    pub fee_paid_native: Option<rust_decimal::Decimal>,
    pub status: CertificationStatus,
    pub retry_count: u32,
    /// Set once `retry_count` reaches `CERTIFICATION_MAX_RETRIES` and the
    /// retry queue gives up (§4.2); distinct from `status == Failed`, which
    /// can also be reached immediately on a non-retriable error.
    pub dead_letter: bool,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletBalance {
    pub asset: String,
    pub network: String,
    pub address: String,
    pub balance: rust_decimal::Decimal,
    pub last_refreshed_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_completed_and_failed_are_terminal() {
        assert!(!RequestState::Initiated.is_terminal());
        assert!(!RequestState::PaymentSettled.is_terminal());
        assert!(RequestState::Completed.is_terminal());
        assert!(RequestState::Failed.is_terminal());
    }
}
