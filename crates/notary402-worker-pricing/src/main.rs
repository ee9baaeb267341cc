//! W3: the pricing/quote worker binary.

mod config;
mod error;
mod methods;
mod oracle_client;

use std::sync::Arc;

use notary402_rpc::server::{Method, WorkerServer};
use notary402_types::ErrorKind;
use notary402_ttlcache::TtlCache;
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

use methods::{PriceParams, PricingWorkerState, QuoteParams, SizeOfParams};
use oracle_client::OracleClient;

type Shared = Arc<PricingWorkerState>;

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

    let cfg = config::load().expect("invalid pricing worker configuration");

    info!("pricing worker starting");

    let state: Shared = Arc::new(PricingWorkerState {
        oracle: OracleClient::new(cfg.oracle_base_url),
        price_cache: TtlCache::new(),
    });

    let mut server = WorkerServer::new();

    server.register(
        "size_of",
        method("size_of", state.clone(), |_state, params| {
            Box::pin(async move {
                let params: SizeOfParams = decode(params)?;
                let result = methods::size_of(params).await?;
                encode(result)
            })
        }),
    );

    server.register(
        "price",
        method("price", state.clone(), |state, params| {
            Box::pin(async move {
                let params: PriceParams = decode(params)?;
                let result = methods::price(&state, params).await?;
                encode(result)
            })
        }),
    );

    server.register(
        "quote",
        method("quote", state.clone(), |_state, params| {
            Box::pin(async move {
                let params: QuoteParams = decode(params)?;
                let result = methods::quote(params).await?;
                encode(result)
            })
        }),
    );

    server.serve(tokio::io::stdin(), tokio::io::stdout()).await
}
