//! W1: the payment worker binary. Speaks line-framed JSON-RPC on its own
//! stdio; owns L1 (signature verification), L2 (EVM RPC adapter), L3
//! (facilitator client), and L6 (TTL caches for nonce replay and
//! settlement idempotency).

mod config;
mod eip712;
mod error;
mod evm_rpc;
mod facilitator_client;
mod methods;

use std::sync::Arc;

use notary402_rpc::server::{Method, WorkerServer};
use notary402_types::ErrorKind;
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

use methods::{
    ConfirmSettlementParams, CreateRequirementParams, EncodeParams, PaymentWorkerState, SettleParams,
    VerifyParams,
};

fn method(name: &'static str, state: methods::Shared, handler: impl Fn(methods::Shared, Value) -> std::pin::Pin<Box<dyn std::future::Future<Output = notary402_rpc::server::HandlerResult> + Send>> + Send + Sync + 'static) -> Method {
    let state = state.clone();
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

    let networks = config::load_network_configs().unwrap_or_else(|err| {
        tracing::error!(error = %err, "failed to load network configuration, starting with none");
        Default::default()
    });
    info!(network_count = networks.len(), "payment worker starting");

    let state: methods::Shared = Arc::new(PaymentWorkerState::new(networks));

    let mut server = WorkerServer::new();

    server.register(
        "create_payment_requirement",
        method("create_payment_requirement", state.clone(), |state, params| {
            Box::pin(async move {
                let params: CreateRequirementParams = decode(params)?;
                let result = methods::create_payment_requirement(&state, params).await?;
                encode(result)
            })
        }),
    );

    server.register(
        "verify_payment",
        method("verify_payment", state.clone(), |state, params| {
            Box::pin(async move {
                let params: VerifyParams = decode(params)?;
                let result = methods::verify_payment(&state, params).await?;
                encode(result)
            })
        }),
    );

    server.register(
        "settle_payment",
        method("settle_payment", state.clone(), |state, params| {
            Box::pin(async move {
                let params: SettleParams = decode(params)?;
                let result = methods::settle_payment(&state, params).await?;
                encode(result)
            })
        }),
    );

    server.register(
        "confirm_settlement",
        method("confirm_settlement", state.clone(), |state, params| {
            Box::pin(async move {
                let params: ConfirmSettlementParams = decode(params)?;
                let result = methods::confirm_settlement(&state, params).await?;
                encode(result)
            })
        }),
    );

    server.register(
        "encode_payment_uri",
        method("encode_payment_uri", state.clone(), |_state, params| {
            Box::pin(async move {
                let params: EncodeParams = decode(params)?;
                let result = methods::encode_payment_uri(params).await?;
                encode(result)
            })
        }),
    );

    server.serve(tokio::io::stdin(), tokio::io::stdout()).await
}
