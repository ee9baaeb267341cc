//! Maps the closed error taxonomy (§7) onto HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use notary402_types::error::ErrorBody;
use notary402_types::ErrorKind;

/// Wraps an `ErrorKind` with the human-readable detail the orchestrator
/// attaches before it crosses the HTTP boundary.
#[derive(Debug)]
pub struct ApiError {
    pub kind: ErrorKind,
    pub message: String,
    pub retry_after: Option<u64>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ApiError {
            kind,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn with_retry_after(mut self, secs: u64) -> Self {
        self.retry_after = Some(secs);
        self
    }

    fn status_code(&self) -> StatusCode {
        match self.kind {
            ErrorKind::ErrValidation => StatusCode::BAD_REQUEST,
            // A failed verification must surface as 402 with the error code
            // in `payment_required.error`, not a plain 400, so a client can
            // sign and submit a fresh authorization in response.
            ErrorKind::ErrBadAuthorization => StatusCode::PAYMENT_REQUIRED,
            ErrorKind::ErrStateConflict => StatusCode::CONFLICT,
            ErrorKind::ErrQuoteExpired => StatusCode::PAYMENT_REQUIRED,
            ErrorKind::ErrDuplicateNonce => StatusCode::CONFLICT,
            ErrorKind::ErrDependency | ErrorKind::ErrTimeout => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::ErrOverload => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::ErrSettlementFailed
            | ErrorKind::ErrLedgerRejected
            | ErrorKind::ErrLedgerInsufficient => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match self.retry_after {
            Some(secs) => ErrorBody::new(self.kind, self.message).with_retry_after(secs),
            None => ErrorBody::new(self.kind, self.message),
        };
        (status, Json(body)).into_response()
    }
}
