use notary402_types::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum CertifyWorkerError {
    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),
    #[error("ledger transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("ledger rejected the transaction: {0}")]
    Rejected(String),
    #[error("server-echoed transaction id {server} does not match client-derived id {client}")]
    IdMismatch { client: String, server: String },
    #[error("service wallet has insufficient native currency balance")]
    InsufficientBalance,
    #[error("signing error: {0}")]
    Signing(String),
    #[error("ledger gateway discovery failed: {0}")]
    Discovery(String),
}

impl CertifyWorkerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CertifyWorkerError::Transport(_) | CertifyWorkerError::Discovery(_) => {
                ErrorKind::ErrDependency
            }
            CertifyWorkerError::Rejected(_) | CertifyWorkerError::IdMismatch { .. } => {
                ErrorKind::ErrLedgerRejected
            }
            CertifyWorkerError::InsufficientBalance => ErrorKind::ErrLedgerInsufficient,
            CertifyWorkerError::UnsupportedNetwork(_) => ErrorKind::ErrValidation,
            CertifyWorkerError::Signing(_) => ErrorKind::ErrDependency,
        }
    }

    /// Whether a retry queue attempt should be consumed for this failure,
    /// per §4.2: network/5xx/timeout/nonce-mismatch are retriable, invalid
    /// signature / payload rejection / insufficient balance are not.
    pub fn retriable(&self) -> bool {
        matches!(self, CertifyWorkerError::Transport(_) | CertifyWorkerError::Discovery(_))
    }
}
