//! Persistence layer (O2): a `sqlx` Postgres pool plus a repository that is
//! the orchestrator's only path to the database — no ad-hoc SQL elsewhere.

pub mod models;
pub mod repo;

pub use repo::{Repo, RepoError};

use sqlx::postgres::PgPoolOptions;

pub async fn connect(database_url: &str, max_connections: u32) -> Result<sqlx::PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}

/// Schema for the four tables of §3, with the uniqueness/check constraints
/// the invariants require. Applied via `sqlx::migrate!` at startup in
/// `main.rs`; kept here as the canonical source the orchestrator ships.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS requests (
    id UUID PRIMARY KEY,
    external_id TEXT NOT NULL UNIQUE,
    client_id TEXT NOT NULL,
    content_hash_hex TEXT NOT NULL,
    byte_size BIGINT NOT NULL,
    state TEXT NOT NULL CHECK (state IN (
        'initiated', 'quoted', 'payment_pending', 'payment_verified',
        'payment_settled', 'certifying', 'completed', 'failed'
    )),
    network TEXT NOT NULL,
    quote_usdc_amount NUMERIC,
    quote_ledger_fee NUMERIC,
    quote_oracle_price NUMERIC,
    quote_expires_at TIMESTAMPTZ,
    payment_requirement JSONB,
    callback_url TEXT,
    modality TEXT NOT NULL CHECK (modality IN ('agent', 'browser', 'mobile')),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    version BIGINT NOT NULL DEFAULT 0,
    webhook_delivered BOOLEAN
);

CREATE TABLE IF NOT EXISTS payments (
    id UUID PRIMARY KEY,
    request_id UUID NOT NULL REFERENCES requests(id) ON DELETE CASCADE,
    nonce TEXT NOT NULL UNIQUE,
    payer TEXT NOT NULL,
    payee TEXT NOT NULL,
    atomic_amount TEXT NOT NULL,
    network TEXT NOT NULL,
    settlement_tx_hash TEXT,
    status TEXT NOT NULL CHECK (status IN ('pending', 'verified', 'settled', 'failed')),
    authorization_blob JSONB NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS certifications (
    id UUID PRIMARY KEY,
    request_id UUID NOT NULL REFERENCES requests(id) ON DELETE CASCADE,
    tx_id TEXT NOT NULL UNIQUE,
    block_id TEXT,
    fee_paid_native NUMERIC,
    status TEXT NOT NULL CHECK (status IN ('pending', 'submitted', 'confirmed', 'failed')),
    retry_count INT NOT NULL DEFAULT 0,
    dead_letter BOOLEAN NOT NULL DEFAULT false,
    last_error TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE IF NOT EXISTS wallet_balances (
    asset TEXT NOT NULL,
    network TEXT NOT NULL,
    address TEXT NOT NULL,
    balance NUMERIC NOT NULL,
    last_refreshed_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (asset, network, address)
);

CREATE INDEX IF NOT EXISTS idx_certifications_retry_scan
    ON certifications (status, updated_at)
    WHERE status NOT IN ('confirmed', 'failed');
"#;
