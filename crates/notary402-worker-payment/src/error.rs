use notary402_types::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum PaymentWorkerError {
    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),
    #[error("malformed authorization: {0}")]
    Malformed(String),
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    #[error("authorization is not within its validity window")]
    InvalidTiming,
    #[error("authorization recipient does not match the payment requirement")]
    RecipientMismatch,
    #[error("authorization asset does not match the payment requirement")]
    AssetMismatch,
    #[error("authorization value does not equal the required amount")]
    AmountMismatch,
    #[error("authorization nonce has already been used")]
    DuplicateNonce,
    #[error("facilitator request failed: {0}")]
    Facilitator(#[from] reqwest::Error),
    #[error("evm rpc call failed: {0}")]
    Rpc(String),
    #[error("clock error: {0}")]
    Clock(#[from] std::time::SystemTimeError),
}

impl PaymentWorkerError {
    pub fn reason(&self) -> &'static str {
        match self {
            PaymentWorkerError::InvalidSignature(_) => "invalid_signature",
            PaymentWorkerError::InvalidTiming => "expired_authorization",
            PaymentWorkerError::DuplicateNonce => "duplicate_nonce",
            PaymentWorkerError::AmountMismatch => "amount_mismatch",
            PaymentWorkerError::RecipientMismatch => "recipient_mismatch",
            PaymentWorkerError::AssetMismatch => "asset_mismatch",
            PaymentWorkerError::UnsupportedNetwork(_) => "unsupported_network",
            PaymentWorkerError::Malformed(_) => "malformed_authorization",
            PaymentWorkerError::Facilitator(_) | PaymentWorkerError::Rpc(_) => "dependency_unavailable",
            PaymentWorkerError::Clock(_) => "clock_error",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            PaymentWorkerError::Facilitator(_) | PaymentWorkerError::Rpc(_) => ErrorKind::ErrDependency,
            PaymentWorkerError::DuplicateNonce => ErrorKind::ErrDuplicateNonce,
            _ => ErrorKind::ErrBadAuthorization,
        }
    }
}
