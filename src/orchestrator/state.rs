//! Shared application state injected into every HTTP handler and background
//! task: the repository, the worker registry, and static configuration.

use std::sync::Arc;
use std::time::Duration;

use notary402_types::ErrorKind;

use crate::config::Config;
use crate::db::{Repo, RepoError};
use crate::transport::WorkerRegistry;

#[derive(Clone)]
pub struct AppState(pub Arc<Inner>);

pub struct Inner {
    pub repo: Repo,
    pub workers: WorkerRegistry,
    pub config: Config,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(repo: Repo, workers: WorkerRegistry, config: Config) -> Self {
        AppState(Arc::new(Inner {
            repo,
            workers,
            config,
            http: reqwest::Client::new(),
        }))
    }
}

impl std::ops::Deref for AppState {
    type Target = Inner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Errors the orchestrator's flow functions raise, unifying repository and
/// worker-transport failures under the closed taxonomy of §7.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("{0}")]
    Repo(#[from] RepoError),
    #[error("{0}")]
    Transport(#[from] notary402_rpc::TransportError),
    #[error("{message}")]
    Kind { kind: ErrorKind, message: String },
}

impl OrchestratorError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        OrchestratorError::Kind {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OrchestratorError::Repo(RepoError::StateConflict) => ErrorKind::ErrStateConflict,
            OrchestratorError::Repo(RepoError::NotFound) => ErrorKind::ErrValidation,
            OrchestratorError::Repo(RepoError::Database(_)) => ErrorKind::ErrDependency,
            OrchestratorError::Transport(err) => ErrorKind::from(err),
            OrchestratorError::Kind { kind, .. } => *kind,
        }
    }
}

impl From<(ErrorKind, String)> for OrchestratorError {
    fn from((kind, message): (ErrorKind, String)) -> Self {
        OrchestratorError::Kind { kind, message }
    }
}

impl From<OrchestratorError> for crate::error::ApiError {
    fn from(err: OrchestratorError) -> Self {
        let kind = err.kind();
        crate::error::ApiError::new(kind, err.to_string())
    }
}

/// Per-call deadlines (§5): facilitator 5s, EVM RPC 3s, ledger REST 10s,
/// status poll at 5s intervals up to a 60s budget, webhook 10s.
pub const PAYMENT_CALL_DEADLINE: Duration = Duration::from_secs(5);
pub const LEDGER_CALL_DEADLINE: Duration = Duration::from_secs(10);
pub const PRICING_CALL_DEADLINE: Duration = Duration::from_secs(5);
pub const ENCODE_CALL_DEADLINE: Duration = Duration::from_secs(5);
pub const CERTIFICATION_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const CERTIFICATION_POLL_BUDGET: Duration = Duration::from_secs(60);
pub const WEBHOOK_CALL_DEADLINE: Duration = Duration::from_secs(10);
/// A `pending` settlement is re-checked at this cadence, up to the budget,
/// before the attempt is given up on (§4.1 step 4).
pub const SETTLEMENT_CONFIRM_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const SETTLEMENT_CONFIRM_POLL_BUDGET: Duration = Duration::from_secs(60);
