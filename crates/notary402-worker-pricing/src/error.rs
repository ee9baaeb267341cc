use notary402_types::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum PricingWorkerError {
    #[error("oracle request failed: {0}")]
    Oracle(#[from] reqwest::Error),
    #[error("oracle is unreachable and no usable cached price remains")]
    NoPriceAvailable,
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl PricingWorkerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PricingWorkerError::Oracle(_) | PricingWorkerError::NoPriceAvailable => {
                ErrorKind::ErrDependency
            }
            PricingWorkerError::Malformed(_) => ErrorKind::ErrValidation,
        }
    }
}
