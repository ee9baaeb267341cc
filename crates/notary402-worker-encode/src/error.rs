use notary402_types::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum EncodeWorkerError {
    #[error("unsupported network for wallet uri encoding")]
    UnsupportedNetwork,
}

impl EncodeWorkerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EncodeWorkerError::UnsupportedNetwork => ErrorKind::ErrValidation,
        }
    }
}
