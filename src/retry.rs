//! Retry queue (O4): scans for Certifications stuck short of a terminal
//! status and resubmits them once their backoff window has elapsed.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use notary402_types::request::{CertificationStatus, RequestState, CERTIFICATION_MAX_RETRIES};

use crate::orchestrator::flow::{poll_certification_to_completion, submit_certification_attempt};
use crate::orchestrator::state::AppState;

/// Backoff schedule indexed by `retry_count` (§4.2), capped at the last
/// entry for any attempt beyond the table's length.
const BACKOFF_SCHEDULE_SECS: &[u64] = &[5, 10, 20, 40, 80, 160, 300, 600, 1200, 1800];

const SCAN_INTERVAL: Duration = Duration::from_secs(5);
const SCAN_BATCH_SIZE: i64 = 100;
/// One dispatch per 100ms (§5), so a recovering dependency isn't hit by a
/// burst of every parked certification at once.
const DISPATCH_SPACING: Duration = Duration::from_millis(100);

fn backoff_for(retry_count: u32) -> Duration {
    let idx = (retry_count as usize).min(BACKOFF_SCHEDULE_SECS.len() - 1);
    Duration::from_secs(BACKOFF_SCHEDULE_SECS[idx])
}

/// Runs until `cancellation_token` fires. Spawned once from `main.rs`
/// alongside the HTTP server.
pub async fn run(state: AppState, cancellation_token: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                info!("retry scanner shutting down");
                return;
            }
            _ = tokio::time::sleep(SCAN_INTERVAL) => {}
        }

        let due = match state.repo.list_certifications_due_for_retry(SCAN_BATCH_SIZE).await {
            Ok(rows) => rows,
            Err(err) => {
                error!(error = %err, "retry scanner failed to list candidates");
                continue;
            }
        };

        for certification in due {
            let elapsed = chrono::Utc::now() - certification.updated_at;
            let due_after = backoff_for(certification.retry_count);
            if elapsed.to_std().unwrap_or(Duration::ZERO) < due_after {
                continue;
            }

            if let Err(err) = retry_one(&state, certification.id, certification.request_id, certification.retry_count).await {
                error!(error = %err, "retry attempt failed");
            }
            tokio::time::sleep(DISPATCH_SPACING).await;
        }
    }
}

/// Re-attempts a single stuck certification: fetches a fresh nonce,
/// resubmits, then resumes polling. Exhausted items are dead-lettered and
/// their owning Request transitioned to `failed`.
#[instrument(skip(state))]
async fn retry_one(
    state: &AppState,
    certification_id: uuid::Uuid,
    request_id: uuid::Uuid,
    retry_count: u32,
) -> Result<(), crate::orchestrator::state::OrchestratorError> {
    if retry_count >= CERTIFICATION_MAX_RETRIES {
        dead_letter(state, certification_id, request_id).await?;
        return Ok(());
    }

    let request = state.repo.get_request(request_id).await?;
    let next_attempt = retry_count + 1;

    match submit_certification_attempt(state, request.id, &request.content_hash_hex, next_attempt).await {
        Ok(certification) => poll_certification_to_completion(state, request.id, certification).await,
        Err(err) if err.kind().retryable() => {
            warn!(request_id = %request.id, attempt = next_attempt, error = %err, "certification retry failed, will retry again");
            state
                .repo
                .update_certification(
                    certification_id,
                    CertificationStatus::Submitted,
                    None,
                    None,
                    next_attempt,
                    false,
                    Some(&err.to_string()),
                )
                .await?;
            Ok(())
        }
        Err(err) => {
            state
                .repo
                .update_certification(
                    certification_id,
                    CertificationStatus::Failed,
                    None,
                    None,
                    next_attempt,
                    false,
                    Some(&err.to_string()),
                )
                .await?;
            state
                .repo
                .advance_state(request.id, request.version, RequestState::Failed)
                .await?;
            Ok(())
        }
    }
}

/// Parks a certification that has exhausted its retry budget and emits the
/// operator alert exactly once (§8): the log only fires on the transition
/// into dead-letter, not on every subsequent scan.
async fn dead_letter(
    state: &AppState,
    certification_id: uuid::Uuid,
    request_id: uuid::Uuid,
) -> Result<(), crate::orchestrator::state::OrchestratorError> {
    state
        .repo
        .update_certification(
            certification_id,
            CertificationStatus::Failed,
            None,
            None,
            CERTIFICATION_MAX_RETRIES,
            true,
            Some("retry budget exhausted"),
        )
        .await?;
    error!(
        alert = true,
        request_id = %request_id,
        certification_id = %certification_id,
        "certification exhausted retry budget, parked as dead letter: operator attention required"
    );

    let request = state.repo.get_request(request_id).await?;
    if !request.state.is_terminal() {
        state
            .repo
            .advance_state(request.id, request.version, RequestState::Failed)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_follows_schedule_and_caps_at_last_entry() {
        assert_eq!(backoff_for(0), Duration::from_secs(5));
        assert_eq!(backoff_for(3), Duration::from_secs(40));
        assert_eq!(backoff_for(9), Duration::from_secs(1800));
        assert_eq!(backoff_for(50), Duration::from_secs(1800));
    }
}
