//! W2: the certification worker binary. Owns L4 (ledger crypto) and L5
//! (ledger REST client with NAG discovery).

mod config;
mod error;
mod ledger_client;
mod ledger_crypto;
mod methods;

use std::sync::Arc;

use notary402_rpc::server::{Method, WorkerServer};
use notary402_types::ErrorKind;
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ledger_client::LedgerClient;
use ledger_crypto::LedgerSigner;
use methods::{
    CertifyWorkerState, FetchNonceParams, GenerateProofParams, PollStatusParams,
    SubmitCertificationParams,
};

type Shared = Arc<CertifyWorkerState>;

fn method(
    name: &'static str,
    state: Shared,
    handler: impl Fn(Shared, Value) -> std::pin::Pin<Box<dyn std::future::Future<Output = notary402_rpc::server::HandlerResult> + Send>>
    + Send
    + Sync
    + 'static,
) -> Method {
    Method {
        descriptor: notary402_types::rpc::ToolDescriptor {
            name: name.to_string(),
            params_schema: json!({}),
            result_schema: json!({}),
        },
        handler: Arc::new(move |params| handler(state.clone(), params)),
    }
}

fn decode<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, (ErrorKind, String)> {
    serde_json::from_value(params).map_err(|e| (ErrorKind::ErrValidation, e.to_string()))
}

fn encode<T: serde::Serialize>(value: T) -> Result<Value, (ErrorKind, String)> {
    serde_json::to_value(value).map_err(|e| (ErrorKind::ErrValidation, e.to_string()))
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let config = config::load().expect("certification worker requires its environment configuration");
    let signer = LedgerSigner::from_hex(&config.ledger_private_key_hex)
        .expect("ledger private key must be valid secp256k1 key material");
    let http = reqwest::Client::new();
    let ledger = LedgerClient::discover(http, &config.nag_discovery_url, &config.network)
        .await
        .expect("ledger gateway discovery must succeed at startup");

    info!(network = %config.network, "certification worker starting");

    let state: Shared = Arc::new(CertifyWorkerState {
        ledger,
        signer,
        blockchain: config.network.clone(),
        explorer_url_template: config.explorer_url_template.clone(),
    });

    let mut server = WorkerServer::new();

    server.register(
        "fetch_wallet_nonce",
        method("fetch_wallet_nonce", state.clone(), |state, params| {
            Box::pin(async move {
                let params: FetchNonceParams = decode(params)?;
                let result = methods::fetch_wallet_nonce(&state, params).await?;
                encode(result)
            })
        }),
    );

    server.register(
        "submit_certification",
        method("submit_certification", state.clone(), |state, params| {
            Box::pin(async move {
                let params: SubmitCertificationParams = decode(params)?;
                let result = methods::submit_certification(&state, params).await?;
                encode(result)
            })
        }),
    );

    server.register(
        "poll_status",
        method("poll_status", state.clone(), |state, params| {
            Box::pin(async move {
                let params: PollStatusParams = decode(params)?;
                let result = methods::poll_status(&state, params).await?;
                encode(result)
            })
        }),
    );

    server.register(
        "generate_proof",
        method("generate_proof", state.clone(), |state, params| {
            Box::pin(async move {
                let params: GenerateProofParams = decode(params)?;
                let result = methods::generate_proof(&state, params).await?;
                encode(result)
            })
        }),
    );

    server.serve(tokio::io::stdin(), tokio::io::stdout()).await
}
