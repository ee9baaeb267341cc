//! W4: the stateless QR-payload and wallet deep-link encoder binary.

mod error;
mod methods;

use notary402_rpc::server::{HandlerResult, Method, WorkerServer};
use notary402_types::ErrorKind;
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::EnvFilter;

use methods::RequirementParams;

fn method<F, Fut>(name: &'static str, handler: F) -> Method
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = HandlerResult> + Send + 'static,
{
    Method {
        descriptor: notary402_types::rpc::ToolDescriptor {
            name: name.to_string(),
            params_schema: json!({}),
            result_schema: json!({}),
        },
        handler: std::sync::Arc::new(move |params| Box::pin(handler(params))),
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

    info!("encode worker starting");

    let mut server = WorkerServer::new();

    server.register(
        "encode_deep_link",
        method("encode_deep_link", |params| async move {
            let params: RequirementParams = decode(params)?;
            let result = methods::encode_deep_link(params).await?;
            encode(result)
        }),
    );

    server.register(
        "encode_qr_payload",
        method("encode_qr_payload", |params| async move {
            let params: RequirementParams = decode(params)?;
            let result = methods::encode_qr_payload(params).await?;
            encode(result)
        }),
    );

    server.register(
        "encode_payment_options",
        method("encode_payment_options", |params| async move {
            let params: RequirementParams = decode(params)?;
            let result = methods::encode_payment_options(params).await?;
            encode(result)
        }),
    );

    server.serve(tokio::io::stdin(), tokio::io::stdout()).await
}
