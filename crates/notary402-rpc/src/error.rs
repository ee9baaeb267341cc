use notary402_types::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to spawn worker: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("worker i/o error: {0}")]
    Io(#[source] std::io::Error),
    #[error("worker response was not valid json: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("worker process exited or stopped responding")]
    WorkerLost,
    #[error("call exceeded its deadline")]
    Timeout,
    #[error("worker in-flight queue is full")]
    Overload,
    #[error("worker returned an error: {0:?} {1}")]
    Remote(ErrorKind, String),
}

impl From<&TransportError> for ErrorKind {
    fn from(value: &TransportError) -> Self {
        match value {
            TransportError::Timeout => ErrorKind::ErrTimeout,
            TransportError::Overload => ErrorKind::ErrOverload,
            TransportError::Remote(kind, _) => *kind,
            TransportError::Spawn(_)
            | TransportError::Io(_)
            | TransportError::Decode(_)
            | TransportError::WorkerLost => ErrorKind::ErrDependency,
        }
    }
}
