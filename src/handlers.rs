//! The thin HTTP collaborator of §6: translates wire requests into calls
//! against the orchestrator's public contract (`src/orchestrator/flow.rs`)
//! and its outcomes into the status codes §6 names.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::json;

use notary402_types::network::Network;
use notary402_types::request::ClientModality;

use crate::error::ApiError;
use crate::orchestrator::flow::{self, PaymentOutcome, SubmissionOutcome};
use crate::orchestrator::state::{AppState, ENCODE_CALL_DEADLINE, PRICING_CALL_DEADLINE};

const PAYMENT_HEADER: &str = "X-PAYMENT";

/// The inbound HTTP surface of §6, mounted onto `AppState` in `main.rs`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/quote", post(post_quote))
        .route("/v1/certify", post(post_certify))
        .route("/v1/status/{request_id}", get(get_status))
        .route("/v1/qr/{request_id}", get(get_qr))
        .route("/supported", get(get_supported))
}

fn decode_body(data: &str, encoding: Option<&str>) -> Result<Vec<u8>, ApiError> {
    let bytes = match encoding {
        Some("base64") => base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| ApiError::new(notary402_types::ErrorKind::ErrValidation, e.to_string()))?,
        Some("hex") => {
            let stripped = data.strip_prefix("0x").unwrap_or(data);
            hex::decode(stripped)
                .map_err(|e| ApiError::new(notary402_types::ErrorKind::ErrValidation, e.to_string()))?
        }
        _ => data.as_bytes().to_vec(),
    };
    Ok(bytes)
}

#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub data: String,
    #[serde(default)]
    pub encoding: Option<String>,
    #[serde(default)]
    pub data_hash: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub quote_id: uuid::Uuid,
    pub data_size_bytes: u64,
    pub quote: flow::QuoteView,
    pub networks_supported: Vec<Network>,
}

/// `POST /v1/quote` — a preview-only price check (§6); unlike `/v1/certify`
/// it creates no Request, so repeated calls are free of side effects.
pub async fn post_quote(
    State(state): State<AppState>,
    Json(body): Json<QuoteRequest>,
) -> Result<Json<QuoteResponse>, ApiError> {
    let bytes = decode_body(&body.data, body.encoding.as_deref())?;

    if let Some(expected) = body.data_hash.as_deref() {
        use sha2::{Digest, Sha256};
        let actual = hex::encode(Sha256::digest(&bytes));
        let expected = expected.strip_prefix("0x").unwrap_or(expected);
        if !actual.eq_ignore_ascii_case(expected) {
            return Err(ApiError::new(
                notary402_types::ErrorKind::ErrValidation,
                "data_hash does not match the submitted data",
            ));
        }
    }

    let price_result = state
        .workers
        .pricing
        .call("price", json!({}), PRICING_CALL_DEADLINE)
        .await
        .map_err(|e| ApiError::new(notary402_types::ErrorKind::from(&e), e.to_string()))?;
    let price: notary402_types::quote::PriceQuote = serde_json::from_value(price_result)
        .map_err(|e| ApiError::new(notary402_types::ErrorKind::ErrDependency, e.to_string()))?;

    let quote_result = state
        .workers
        .pricing
        .call(
            "quote",
            json!({ "bytes": bytes.len() as u64, "price": price.price }),
            PRICING_CALL_DEADLINE,
        )
        .await
        .map_err(|e| ApiError::new(notary402_types::ErrorKind::from(&e), e.to_string()))?;
    let quote: notary402_types::quote::Quote = serde_json::from_value(quote_result)
        .map_err(|e| ApiError::new(notary402_types::ErrorKind::ErrDependency, e.to_string()))?;

    Ok(Json(QuoteResponse {
        quote_id: uuid::Uuid::new_v4(),
        data_size_bytes: bytes.len() as u64,
        quote: flow::QuoteView {
            usdc_amount: quote.usdc_amount,
            cirx_fee: quote.cirx_fee,
            cirx_price_usd: quote.cirx_price_usd,
            valid_until: quote.valid_until,
        },
        networks_supported: Network::variants().to_vec(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CertifyRequest {
    pub request_id: String,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
    pub network: Network,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default)]
    pub client_type: Option<String>,
}

fn modality_from_client_type(client_type: Option<&str>) -> ClientModality {
    match client_type {
        Some("browser") => ClientModality::Browser,
        Some("mobile") => ClientModality::Mobile,
        _ => ClientModality::Agent,
    }
}

/// `POST /v1/certify` (§6): with no `X-PAYMENT` header, quotes and issues a
/// payment requirement (402); with one, attempts to settle it and kick off
/// certification.
pub async fn post_certify(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CertifyRequest>,
) -> Response {
    let payment_header = headers
        .get(PAYMENT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    match payment_header {
        Some(authorization_b64) => {
            match flow::handle_payment(&state, &body.request_id, &authorization_b64).await {
                Ok(PaymentOutcome::Completed { proof }) => {
                    (StatusCode::OK, Json(json!({ "proof": proof }))).into_response()
                }
                Ok(PaymentOutcome::Accepted { status_url }) => {
                    (StatusCode::ACCEPTED, Json(json!({ "status_url": status_url }))).into_response()
                }
                Err(err) => ApiError::from(err).into_response(),
            }
        }
        None => {
            let Some(data) = body.data.as_deref() else {
                return ApiError::new(
                    notary402_types::ErrorKind::ErrValidation,
                    "data is required for a new submission",
                )
                .into_response();
            };
            let bytes = match decode_body(data, body.encoding.as_deref()) {
                Ok(bytes) => bytes,
                Err(err) => return err.into_response(),
            };
            let modality = modality_from_client_type(body.client_type.as_deref());
            let client_id = headers
                .get("X-Client-Id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or(&body.request_id);
            match flow::handle_submission(
                &state,
                &body.request_id,
                client_id,
                &bytes,
                body.network,
                modality,
                body.callback_url.clone(),
            )
            .await
            {
                Ok(SubmissionOutcome::PaymentRequired(required)) => {
                    (StatusCode::PAYMENT_REQUIRED, Json(required)).into_response()
                }
                Ok(SubmissionOutcome::Accepted { status_url }) => {
                    (StatusCode::ACCEPTED, Json(json!({ "status_url": status_url }))).into_response()
                }
                Ok(SubmissionOutcome::Completed { proof }) => {
                    (StatusCode::OK, Json(json!({ "proof": proof }))).into_response()
                }
                Ok(SubmissionOutcome::Failed { error }) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, Json(error)).into_response()
                }
                Err(err) => ApiError::from(err).into_response(),
            }
        }
    }
}

/// `GET /v1/status/{request_id}`.
pub async fn get_status(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<flow::StatusSnapshot>, ApiError> {
    let snapshot = flow::handle_status_query(&state, &request_id).await?;
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
pub struct QrParams {
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "ascii".to_string()
}

#[derive(Debug, Serialize)]
pub struct QrResponse {
    pub payload: String,
    pub encoding: String,
    pub format: String,
}

/// `GET /v1/qr/{request_id}?format=png|svg|ascii` (§6). Rendering the
/// requested raster/vector format from the payload is the client's job;
/// this endpoint hands back the payload string the worker builds plus the
/// requested format so the caller knows how to interpret it.
pub async fn get_qr(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
    Query(params): Query<QrParams>,
) -> Result<Json<QrResponse>, ApiError> {
    let request = state
        .repo
        .get_request_by_external_id(&request_id)
        .await
        .map_err(|e| ApiError::new(notary402_types::ErrorKind::ErrValidation, e.to_string()))?;
    let requirement = request.payment_requirement.ok_or_else(|| {
        ApiError::new(
            notary402_types::ErrorKind::ErrValidation,
            "request has no payment requirement yet",
        )
    })?;

    let result = state
        .workers
        .encode
        .call(
            "encode_qr_payload",
            json!({ "requirement": requirement }),
            ENCODE_CALL_DEADLINE,
        )
        .await
        .map_err(|e| ApiError::new(notary402_types::ErrorKind::from(&e), e.to_string()))?;
    #[derive(Deserialize)]
    struct Encoded {
        payload: String,
        encoding: String,
    }
    let encoded: Encoded = serde_json::from_value(result)
        .map_err(|e| ApiError::new(notary402_types::ErrorKind::ErrDependency, e.to_string()))?;

    Ok(Json(QrResponse {
        payload: encoded.payload,
        encoding: encoded.encoding,
        format: params.format,
    }))
}

#[derive(Debug, Serialize)]
pub struct SupportedResponse {
    pub networks: Vec<Network>,
    pub modalities: &'static [&'static str],
}

/// `GET /supported`: read-only discovery of what this deployment is
/// configured for, mirroring the upstream facilitator's own endpoint.
pub async fn get_supported() -> Json<SupportedResponse> {
    Json(SupportedResponse {
        networks: Network::variants().to_vec(),
        modalities: &["agent", "browser", "mobile"],
    })
}
