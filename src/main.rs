//! notaryd: payment-gated blockchain certification orchestrator entrypoint.
//!
//! - Loads `.env` variables and parses configuration.
//! - Initializes tracing.
//! - Connects to Postgres and applies the schema.
//! - Spawns the four worker subprocesses (W1-W4).
//! - Starts the retry-queue scanner as a background task.
//! - Starts an Axum HTTP server exposing the §6 surface.

mod config;
mod db;
mod error;
mod handlers;
mod orchestrator;
mod retry;
mod sig_down;
mod telemetry;
mod transport;
mod webhook;

use std::net::SocketAddr;

use axum::Router;
use axum::http::Method;
use dotenvy::dotenv;
use tower_http::cors;

use crate::config::Config;
use crate::db::Repo;
use crate::orchestrator::state::AppState;
use crate::sig_down::SigDown;
use crate::telemetry::Telemetry;
use crate::transport::WorkerRegistry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    let _telemetry = Telemetry::new();

    // sqlx (runtime-tokio-rustls) and reqwest (rustls-tls) each pull in a
    // rustls crypto backend; with more than one candidate in the dependency
    // graph the first TLS handshake panics unless a default is installed.
    rustls::crypto::CryptoProvider::install_default(rustls::crypto::ring::default_provider())
        .expect("failed to install rustls crypto provider");

    let config = Config::load();

    let pool = db::connect(&config.cli.database_url, config.cli.database_max_connections).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    let repo = Repo::new(pool);

    let workers = WorkerRegistry::spawn(&config).await?;

    let sig_down = SigDown::try_new()?;
    let cancellation_token = sig_down.cancellation_token();

    let state = AppState::new(repo, workers, config);

    match orchestrator::flow::reconcile_orphaned_certifications(&state).await {
        Ok(0) => {}
        Ok(count) => tracing::warn!(count, "resubmitted certifying requests orphaned by a prior crash"),
        Err(err) => tracing::error!(error = %err, "failed to scan for orphaned certifying requests"),
    }

    let retry_task = tokio::spawn(retry::run(state.clone(), cancellation_token.clone()));

    let app = Router::new()
        .merge(handlers::routes())
        .with_state(state.clone())
        .layer(_telemetry.http_tracing())
        .layer(
            cors::CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(cors::Any),
        );

    let addr = SocketAddr::new(state.config.cli.host, state.config.cli.port);
    tracing::info!("starting notaryd on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let shutdown_token = cancellation_token.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown_token.cancelled().await })
        .await?;

    cancellation_token.cancel();
    let _ = retry_task.await;
    state.workers.shutdown();

    Ok(())
}
