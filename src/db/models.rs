//! Row shapes as they exist in Postgres, and the conversions into the
//! shared `notary402_types::request` model the rest of the orchestrator
//! speaks. Enumerated columns are stored as `text` with a check constraint
//! (§4.8) and translated here rather than leaning on a Postgres enum type,
//! which would need a migration step for every new variant.

use chrono::{DateTime, Utc};
use notary402_types::network::Network;
use notary402_types::request::{
    Certification, CertificationStatus, ClientModality, Payment, PaymentStatus, Request,
    RequestState,
};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct RequestRow {
    pub id: Uuid,
    pub external_id: String,
    pub client_id: String,
    pub content_hash_hex: String,
    pub byte_size: i64,
    pub state: String,
    pub network: String,
    pub quote_usdc_amount: Option<rust_decimal::Decimal>,
    pub quote_ledger_fee: Option<rust_decimal::Decimal>,
    pub quote_oracle_price: Option<rust_decimal::Decimal>,
    pub quote_expires_at: Option<DateTime<Utc>>,
    pub payment_requirement: Option<serde_json::Value>,
    pub callback_url: Option<String>,
    pub modality: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
    pub webhook_delivered: Option<bool>,
}

fn state_to_str(state: RequestState) -> &'static str {
    match state {
        RequestState::Initiated => "initiated",
        RequestState::Quoted => "quoted",
        RequestState::PaymentPending => "payment_pending",
        RequestState::PaymentVerified => "payment_verified",
        RequestState::PaymentSettled => "payment_settled",
        RequestState::Certifying => "certifying",
        RequestState::Completed => "completed",
        RequestState::Failed => "failed",
    }
}

fn state_from_str(s: &str) -> RequestState {
    match s {
        "initiated" => RequestState::Initiated,
        "quoted" => RequestState::Quoted,
        "payment_pending" => RequestState::PaymentPending,
        "payment_verified" => RequestState::PaymentVerified,
        "payment_settled" => RequestState::PaymentSettled,
        "certifying" => RequestState::Certifying,
        "completed" => RequestState::Completed,
        _ => RequestState::Failed,
    }
}

fn modality_to_str(modality: ClientModality) -> &'static str {
    match modality {
        ClientModality::Agent => "agent",
        ClientModality::Browser => "browser",
        ClientModality::Mobile => "mobile",
    }
}

fn modality_from_str(s: &str) -> ClientModality {
    match s {
        "browser" => ClientModality::Browser,
        "mobile" => ClientModality::Mobile,
        _ => ClientModality::Agent,
    }
}

impl From<RequestRow> for Request {
    fn from(row: RequestRow) -> Self {
        Request {
            id: row.id,
            external_id: row.external_id,
            client_id: row.client_id,
            content_hash_hex: row.content_hash_hex,
            byte_size: row.byte_size as u64,
            state: state_from_str(&row.state),
            network: Network::from_str(&row.network).unwrap_or(Network::Base),
            quote_usdc_amount: row.quote_usdc_amount,
            quote_ledger_fee: row.quote_ledger_fee,
            quote_oracle_price: row.quote_oracle_price,
            quote_expires_at: row.quote_expires_at,
            payment_requirement: row
                .payment_requirement
                .and_then(|v| serde_json::from_value(v).ok()),
            callback_url: row.callback_url,
            modality: modality_from_str(&row.modality),
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
            webhook_delivered: row.webhook_delivered,
        }
    }
}

pub struct NewRequest {
    pub external_id: String,
    pub client_id: String,
    pub content_hash_hex: String,
    pub byte_size: i64,
    pub network: Network,
    pub modality: ClientModality,
    pub callback_url: Option<String>,
}

pub fn modality_column(modality: ClientModality) -> &'static str {
    modality_to_str(modality)
}

pub fn state_column(state: RequestState) -> &'static str {
    state_to_str(state)
}

#[derive(Debug, sqlx::FromRow)]
pub struct PaymentRow {
    pub id: Uuid,
    pub request_id: Uuid,
    pub nonce: String,
    pub payer: String,
    pub payee: String,
    pub atomic_amount: String,
    pub network: String,
    pub settlement_tx_hash: Option<String>,
    pub status: String,
    pub authorization_blob: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn payment_status_to_str(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Pending => "pending",
        PaymentStatus::Verified => "verified",
        PaymentStatus::Settled => "settled",
        PaymentStatus::Failed => "failed",
    }
}

fn payment_status_from_str(s: &str) -> PaymentStatus {
    match s {
        "verified" => PaymentStatus::Verified,
        "settled" => PaymentStatus::Settled,
        "failed" => PaymentStatus::Failed,
        _ => PaymentStatus::Pending,
    }
}

pub fn payment_status_column(status: PaymentStatus) -> &'static str {
    payment_status_to_str(status)
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Payment {
            id: row.id,
            request_id: row.request_id,
            nonce: row.nonce,
            payer: row.payer,
            payee: row.payee,
            atomic_amount: row.atomic_amount,
            network: Network::from_str(&row.network).unwrap_or(Network::Base),
            settlement_tx_hash: row.settlement_tx_hash,
            status: payment_status_from_str(&row.status),
            authorization_blob: row.authorization_blob,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct CertificationRow {
    pub id: Uuid,
    pub request_id: Uuid,
    pub tx_id: String,
    pub block_id: Option<String>,
    pub fee_paid_native: Option<rust_decimal::Decimal>,
    pub status: String,
    pub retry_count: i32,
    pub dead_letter: bool,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn certification_status_to_str(status: CertificationStatus) -> &'static str {
    match status {
        CertificationStatus::Pending => "pending",
        CertificationStatus::Submitted => "submitted",
        CertificationStatus::Confirmed => "confirmed",
        CertificationStatus::Failed => "failed",
    }
}

fn certification_status_from_str(s: &str) -> CertificationStatus {
    match s {
        "submitted" => CertificationStatus::Submitted,
        "confirmed" => CertificationStatus::Confirmed,
        "failed" => CertificationStatus::Failed,
        _ => CertificationStatus::Pending,
    }
}

pub fn certification_status_column(status: CertificationStatus) -> &'static str {
    certification_status_to_str(status)
}

impl From<CertificationRow> for Certification {
    fn from(row: CertificationRow) -> Self {
        Certification {
            id: row.id,
            request_id: row.request_id,
            tx_id: row.tx_id,
            block_id: row.block_id,
            fee_paid_native: row.fee_paid_native,
            status: certification_status_from_str(&row.status),
            retry_count: row.retry_count as u32,
            dead_letter: row.dead_letter,
            last_error: row.last_error,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
