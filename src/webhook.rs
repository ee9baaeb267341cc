//! Webhook dispatcher (O5): best-effort delivery of the completed proof to
//! a caller-supplied callback URL, signed so the receiver can authenticate
//! the sender.

use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use tracing::{instrument, warn};
use uuid::Uuid;

use notary402_types::proof::Proof;

use crate::orchestrator::state::{AppState, WEBHOOK_CALL_DEADLINE};

type HmacSha256 = Hmac<Sha256>;

const RETRY_BACKOFFS: &[std::time::Duration] = &[
    std::time::Duration::from_secs(10),
    std::time::Duration::from_secs(30),
    std::time::Duration::from_secs(90),
];

#[derive(Debug, Serialize)]
struct WebhookBody<'a> {
    proof: &'a Proof,
    timestamp: chrono::DateTime<chrono::Utc>,
}

/// Looks up the Request's callback URL, if any, and attempts delivery with
/// the retry schedule of §4.3. Never propagates a failure: delivery outcome
/// is recorded on the Request and nothing else observes it.
#[instrument(skip(state, proof))]
pub async fn dispatch_if_configured(state: &AppState, request_id: Uuid, proof: &Proof) {
    let request = match state.repo.get_request(request_id).await {
        Ok(request) => request,
        Err(err) => {
            warn!(request_id = %request_id, error = %err, "webhook dispatch could not load request");
            return;
        }
    };

    let Some(callback_url) = request.callback_url.as_deref() else {
        return;
    };

    let body = WebhookBody {
        proof,
        timestamp: chrono::Utc::now(),
    };
    let raw_body = match serde_json::to_vec(&body) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(request_id = %request_id, error = %err, "webhook body failed to serialize");
            return;
        }
    };

    let signature = sign(&state.config.cli.webhook_signing_secret, &raw_body);
    let delivered = deliver_with_retries(state, callback_url, &raw_body, &signature).await;

    if let Err(err) = state.repo.record_webhook_outcome(request_id, delivered).await {
        warn!(request_id = %request_id, error = %err, "failed to record webhook delivery outcome");
    }
}

fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

async fn deliver_with_retries(state: &AppState, url: &str, body: &[u8], signature: &str) -> bool {
    if try_once(state, url, body, signature).await {
        return true;
    }
    for backoff in RETRY_BACKOFFS {
        tokio::time::sleep(*backoff).await;
        if try_once(state, url, body, signature).await {
            return true;
        }
    }
    warn!(url, "webhook delivery exhausted all retries");
    false
}

async fn try_once(state: &AppState, url: &str, body: &[u8], signature: &str) -> bool {
    let result = state
        .http
        .post(url)
        .header("Content-Type", "application/json")
        .header("X-Webhook-Signature", signature)
        .timeout(WEBHOOK_CALL_DEADLINE)
        .body(body.to_vec())
        .send()
        .await;

    match result {
        Ok(response) if response.status().is_success() => true,
        Ok(response) => {
            warn!(url, status = %response.status(), "webhook delivery received non-2xx");
            false
        }
        Err(err) => {
            warn!(url, error = %err, "webhook delivery connection error");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic_for_same_body_and_secret() {
        let a = sign("secret", b"{\"hello\":true}");
        let b = sign("secret", b"{\"hello\":true}");
        assert_eq!(a, b);
    }

    #[test]
    fn signature_changes_with_body() {
        let a = sign("secret", b"{\"a\":1}");
        let b = sign("secret", b"{\"a\":2}");
        assert_ne!(a, b);
    }
}
