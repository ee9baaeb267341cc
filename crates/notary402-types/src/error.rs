//! The closed error taxonomy of §7, returned from the orchestrator's public
//! contract and propagated up from every worker call.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    #[error("bad input")]
    ErrValidation,
    #[error("authorization invalid")]
    ErrBadAuthorization,
    #[error("upstream dependency unavailable")]
    ErrDependency,
    #[error("settlement failed")]
    ErrSettlementFailed,
    #[error("certification transaction rejected by ledger")]
    ErrLedgerRejected,
    #[error("service wallet out of native currency")]
    ErrLedgerInsufficient,
    #[error("quote has expired")]
    ErrQuoteExpired,
    #[error("duplicate authorization nonce")]
    ErrDuplicateNonce,
    #[error("operation timed out")]
    ErrTimeout,
    #[error("system overloaded")]
    ErrOverload,
    #[error("state conflict")]
    ErrStateConflict,
}

impl ErrorKind {
    /// Whether a client may retry the same request after receiving this
    /// error, per the propagation policy of §7.
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::ErrDependency | ErrorKind::ErrTimeout | ErrorKind::ErrOverload
        )
    }
}

/// The `{code, message, retryable, retry_after?}` structured error body
/// returned on a status query failure or a 4xx/5xx HTTP response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorKind,
    pub message: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ErrorBody {
    pub fn new(code: ErrorKind, message: impl Into<String>) -> Self {
        ErrorBody {
            retryable: code.retryable(),
            code,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_error_kind_as_snake_case() {
        let json = serde_json::to_string(&ErrorKind::ErrBadAuthorization).unwrap();
        assert_eq!(json, "\"err_bad_authorization\"");
    }

    #[test]
    fn dependency_errors_are_retryable_validation_errors_are_not() {
        assert!(ErrorKind::ErrDependency.retryable());
        assert!(!ErrorKind::ErrValidation.retryable());
    }
}
