//! The orchestrator's only path to Postgres (§3, §4). Every state
//! transition that must survive a crash goes through here; the in-memory
//! orchestrator state (`src/orchestrator/state.rs`) is a cache over this.

use chrono::{DateTime, Utc};
use notary402_types::network::Network;
use notary402_types::request::{
    Certification, CertificationStatus, ClientModality, Payment, PaymentStatus, Request,
    RequestState,
};
use uuid::Uuid;

use super::models::{
    CertificationRow, NewRequest, PaymentRow, RequestRow, certification_status_column,
    modality_column, payment_status_column, state_column,
};

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// The optimistic-lease `UPDATE ... WHERE id = $1 AND version = $2`
    /// touched zero rows: another writer moved the row first (§4.1).
    #[error("state conflict: request was updated concurrently")]
    StateConflict,
    #[error("not found")]
    NotFound,
}

#[derive(Clone)]
pub struct Repo {
    pool: sqlx::PgPool,
}

impl Repo {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Repo { pool }
    }

    pub async fn create_request(&self, new: NewRequest) -> Result<Request, RepoError> {
        let id = Uuid::new_v4();
        let row = sqlx::query_as::<_, RequestRow>(
            r#"
            INSERT INTO requests
                (id, external_id, client_id, content_hash_hex, byte_size, state, network, modality, callback_url)
            VALUES
                ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING
                id, external_id, client_id, content_hash_hex, byte_size, state, network,
                quote_usdc_amount, quote_ledger_fee, quote_oracle_price, quote_expires_at,
                payment_requirement, callback_url, modality, created_at, updated_at, version, webhook_delivered
            "#,
        )
        .bind(id)
        .bind(&new.external_id)
        .bind(&new.client_id)
        .bind(&new.content_hash_hex)
        .bind(new.byte_size)
        .bind(state_column(RequestState::Initiated))
        .bind(new.network.to_string())
        .bind(modality_column(new.modality))
        .bind(&new.callback_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    pub async fn get_request(&self, id: Uuid) -> Result<Request, RepoError> {
        let row = sqlx::query_as::<_, RequestRow>(
            r#"SELECT id, external_id, client_id, content_hash_hex, byte_size, state, network,
                      quote_usdc_amount, quote_ledger_fee, quote_oracle_price, quote_expires_at,
                      payment_requirement, callback_url, modality, created_at, updated_at, version, webhook_delivered
               FROM requests WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::NotFound)?;
        Ok(row.into())
    }

    pub async fn get_request_by_external_id(&self, external_id: &str) -> Result<Request, RepoError> {
        let row = sqlx::query_as::<_, RequestRow>(
            r#"SELECT id, external_id, client_id, content_hash_hex, byte_size, state, network,
                      quote_usdc_amount, quote_ledger_fee, quote_oracle_price, quote_expires_at,
                      payment_requirement, callback_url, modality, created_at, updated_at, version, webhook_delivered
               FROM requests WHERE external_id = $1"#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::NotFound)?;
        Ok(row.into())
    }

    /// Sets the quote fields and advances `state` to `quoted`, gated on the
    /// caller's observed `version` (§4.1's optimistic lease).
    pub async fn set_quote(
        &self,
        id: Uuid,
        expected_version: i64,
        usdc_amount: rust_decimal::Decimal,
        ledger_fee: rust_decimal::Decimal,
        oracle_price: rust_decimal::Decimal,
        expires_at: DateTime<Utc>,
    ) -> Result<Request, RepoError> {
        let row = sqlx::query_as::<_, RequestRow>(
            r#"
            UPDATE requests SET
                state = $1,
                quote_usdc_amount = $2,
                quote_ledger_fee = $3,
                quote_oracle_price = $4,
                quote_expires_at = $5,
                updated_at = now(),
                version = version + 1
            WHERE id = $6 AND version = $7
            RETURNING
                id, external_id, client_id, content_hash_hex, byte_size, state, network,
                quote_usdc_amount, quote_ledger_fee, quote_oracle_price, quote_expires_at,
                payment_requirement, callback_url, modality, created_at, updated_at, version, webhook_delivered
            "#,
        )
        .bind(state_column(RequestState::Quoted))
        .bind(usdc_amount)
        .bind(ledger_fee)
        .bind(oracle_price)
        .bind(expires_at)
        .bind(id)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::StateConflict)?;
        Ok(row.into())
    }

    /// Moves `requests.state` forward, gated on the caller's observed
    /// `version`. Used for every transition in §4.1's state diagram that
    /// isn't `set_quote`.
    pub async fn advance_state(
        &self,
        id: Uuid,
        expected_version: i64,
        next: RequestState,
    ) -> Result<Request, RepoError> {
        let row = sqlx::query_as::<_, RequestRow>(
            r#"
            UPDATE requests SET
                state = $1,
                updated_at = now(),
                version = version + 1
            WHERE id = $2 AND version = $3
            RETURNING
                id, external_id, client_id, content_hash_hex, byte_size, state, network,
                quote_usdc_amount, quote_ledger_fee, quote_oracle_price, quote_expires_at,
                payment_requirement, callback_url, modality, created_at, updated_at, version, webhook_delivered
            "#,
        )
        .bind(state_column(next))
        .bind(id)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::StateConflict)?;
        Ok(row.into())
    }

    /// Records the exact requirement handed to the client and advances to
    /// `payment_pending`, gated on the observed `version`.
    pub async fn set_payment_requirement(
        &self,
        id: Uuid,
        expected_version: i64,
        requirement: &notary402_types::payment::PaymentRequirement,
    ) -> Result<Request, RepoError> {
        let value = serde_json::to_value(requirement).expect("PaymentRequirement always serializes");
        let row = sqlx::query_as::<_, RequestRow>(
            r#"
            UPDATE requests SET
                state = $1,
                payment_requirement = $2,
                updated_at = now(),
                version = version + 1
            WHERE id = $3 AND version = $4
            RETURNING
                id, external_id, client_id, content_hash_hex, byte_size, state, network,
                quote_usdc_amount, quote_ledger_fee, quote_oracle_price, quote_expires_at,
                payment_requirement, callback_url, modality, created_at, updated_at, version, webhook_delivered
            "#,
        )
        .bind(state_column(RequestState::PaymentPending))
        .bind(value)
        .bind(id)
        .bind(expected_version)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::StateConflict)?;
        Ok(row.into())
    }

    pub async fn record_webhook_outcome(&self, id: Uuid, delivered: bool) -> Result<(), RepoError> {
        sqlx::query("UPDATE requests SET webhook_delivered = $1, updated_at = now() WHERE id = $2")
            .bind(delivered)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert_payment(
        &self,
        request_id: Uuid,
        nonce: &str,
        payer: &str,
        payee: &str,
        atomic_amount: &str,
        network: Network,
        status: PaymentStatus,
        authorization_blob: serde_json::Value,
    ) -> Result<Payment, RepoError> {
        let id = Uuid::new_v4();
        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
            INSERT INTO payments
                (id, request_id, nonce, payer, payee, atomic_amount, network, status, authorization_blob)
            VALUES
                ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING
                id, request_id, nonce, payer, payee, atomic_amount, network,
                settlement_tx_hash, status, authorization_blob, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(request_id)
        .bind(nonce)
        .bind(payer)
        .bind(payee)
        .bind(atomic_amount)
        .bind(network.to_string())
        .bind(payment_status_column(status))
        .bind(authorization_blob)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    pub async fn get_payment_by_nonce(&self, nonce: &str) -> Result<Option<Payment>, RepoError> {
        let row = sqlx::query_as::<_, PaymentRow>(
            r#"SELECT id, request_id, nonce, payer, payee, atomic_amount, network,
                      settlement_tx_hash, status, authorization_blob, created_at, updated_at
               FROM payments WHERE nonce = $1"#,
        )
        .bind(nonce)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn update_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
        settlement_tx_hash: Option<&str>,
    ) -> Result<Payment, RepoError> {
        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
            UPDATE payments SET
                status = $1,
                settlement_tx_hash = COALESCE($2, settlement_tx_hash),
                updated_at = now()
            WHERE id = $3
            RETURNING
                id, request_id, nonce, payer, payee, atomic_amount, network,
                settlement_tx_hash, status, authorization_blob, created_at, updated_at
            "#,
        )
        .bind(payment_status_column(status))
        .bind(settlement_tx_hash)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::NotFound)?;
        Ok(row.into())
    }

    pub async fn insert_certification(&self, request_id: Uuid, tx_id: &str) -> Result<Certification, RepoError> {
        let id = Uuid::new_v4();
        let row = sqlx::query_as::<_, CertificationRow>(
            r#"
            INSERT INTO certifications (id, request_id, tx_id, status)
            VALUES ($1, $2, $3, $4)
            RETURNING
                id, request_id, tx_id, block_id, fee_paid_native, status,
                retry_count, dead_letter, last_error, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(request_id)
        .bind(tx_id)
        .bind(certification_status_column(CertificationStatus::Pending))
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    /// The most recently updated Certification attempt for a Request (§3:
    /// "only the last confirmed row is canonical", but earlier attempts are
    /// kept for audit).
    pub async fn get_certification_by_request_id(
        &self,
        request_id: Uuid,
    ) -> Result<Option<Certification>, RepoError> {
        let row = sqlx::query_as::<_, CertificationRow>(
            r#"SELECT id, request_id, tx_id, block_id, fee_paid_native, status,
                      retry_count, dead_letter, last_error, created_at, updated_at
               FROM certifications WHERE request_id = $1
               ORDER BY updated_at DESC LIMIT 1"#,
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn get_certification_by_tx_id(&self, tx_id: &str) -> Result<Option<Certification>, RepoError> {
        let row = sqlx::query_as::<_, CertificationRow>(
            r#"SELECT id, request_id, tx_id, block_id, fee_paid_native, status,
                      retry_count, dead_letter, last_error, created_at, updated_at
               FROM certifications WHERE tx_id = $1"#,
        )
        .bind(tx_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    /// Updates status/terminal fields on a certification; `retry_count` is
    /// set absolutely (the retry scanner computes the next value itself so
    /// it can apply the backoff schedule of §4.2).
    #[allow(clippy::too_many_arguments)]
    pub async fn update_certification(
        &self,
        id: Uuid,
        status: CertificationStatus,
        block_id: Option<&str>,
        fee_paid_native: Option<rust_decimal::Decimal>,
        retry_count: u32,
        dead_letter: bool,
        last_error: Option<&str>,
    ) -> Result<Certification, RepoError> {
        let row = sqlx::query_as::<_, CertificationRow>(
            r#"
            UPDATE certifications SET
                status = $1,
                block_id = COALESCE($2, block_id),
                fee_paid_native = COALESCE($3, fee_paid_native),
                retry_count = $4,
                dead_letter = $5,
                last_error = $6,
                updated_at = now()
            WHERE id = $7
            RETURNING
                id, request_id, tx_id, block_id, fee_paid_native, status,
                retry_count, dead_letter, last_error, created_at, updated_at
            "#,
        )
        .bind(certification_status_column(status))
        .bind(block_id)
        .bind(fee_paid_native)
        .bind(retry_count as i32)
        .bind(dead_letter)
        .bind(last_error)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepoError::NotFound)?;
        Ok(row.into())
    }

    /// Certifications still in flight (§4.2's retry scanner): not yet
    /// `confirmed`, not dead-lettered, and due by the backoff schedule
    /// tracked against `updated_at`.
    pub async fn list_certifications_due_for_retry(&self, max: i64) -> Result<Vec<Certification>, RepoError> {
        let rows = sqlx::query_as::<_, CertificationRow>(
            r#"
            SELECT id, request_id, tx_id, block_id, fee_paid_native, status,
                   retry_count, dead_letter, last_error, created_at, updated_at
            FROM certifications
            WHERE status NOT IN ('confirmed', 'failed')
              AND dead_letter = false
            ORDER BY updated_at ASC
            LIMIT $1
            "#,
        )
        .bind(max)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Requests parked in `certifying` with no Certification row at all: the
    /// process crashed between `submit_certification_attempt`'s worker call
    /// and the `insert_certification` write, so the retry scanner (which
    /// only looks at existing Certification rows) will never pick these up.
    pub async fn list_orphaned_certifying_requests(&self) -> Result<Vec<Request>, RepoError> {
        let rows = sqlx::query_as::<_, RequestRow>(
            r#"
            SELECT r.id, r.external_id, r.client_id, r.content_hash_hex, r.byte_size, r.state, r.network,
                   r.quote_usdc_amount, r.quote_ledger_fee, r.quote_oracle_price, r.quote_expires_at,
                   r.payment_requirement, r.callback_url, r.modality, r.created_at, r.updated_at, r.version,
                   r.webhook_delivered
            FROM requests r
            LEFT JOIN certifications c ON c.request_id = r.id
            WHERE r.state = 'certifying' AND c.id IS NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn upsert_wallet_balance(
        &self,
        asset: &str,
        network: &str,
        address: &str,
        balance: rust_decimal::Decimal,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO wallet_balances (asset, network, address, balance, last_refreshed_at)
            VALUES ($1, $2, $3, $4, now())
            ON CONFLICT (asset, network, address)
            DO UPDATE SET balance = EXCLUDED.balance, last_refreshed_at = now()
            "#,
        )
        .bind(asset)
        .bind(network)
        .bind(address)
        .bind(balance)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_wallet_balance(
        &self,
        asset: &str,
        network: &str,
        address: &str,
    ) -> Result<Option<rust_decimal::Decimal>, RepoError> {
        let row: Option<(rust_decimal::Decimal,)> = sqlx::query_as(
            "SELECT balance FROM wallet_balances WHERE asset = $1 AND network = $2 AND address = $3",
        )
        .bind(asset)
        .bind(network)
        .bind(address)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(b,)| b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `NewRequest` exists purely to collect the columns `create_request`
    /// needs; this guards the field list against silent drift.
    #[test]
    fn new_request_carries_all_insert_columns() {
        let new = NewRequest {
            external_id: "ext-1".to_string(),
            client_id: "client-1".to_string(),
            content_hash_hex: "ab".repeat(32),
            byte_size: 1024,
            network: Network::Base,
            modality: ClientModality::Agent,
            callback_url: None,
        };
        assert_eq!(new.external_id, "ext-1");
        assert_eq!(new.byte_size, 1024);
    }
}
