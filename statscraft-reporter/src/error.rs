//! Error types surfaced by the reporter.

use std::fmt;

/// Failure delivering a report document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Network or IO failure, including non-success HTTP statuses
    Io(String),
    /// The endpoint answered without a response line
    EmptyResponse,
    /// The endpoint rejected the report; holds the detail after the `ERR` marker
    Rejected(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Io(e) => write!(f, "transport failure: {}", e),
            TransportError::EmptyResponse => write!(f, "Response was null"),
            TransportError::Rejected(detail) => write!(f, "report rejected: {}", detail),
        }
    }
}

impl std::error::Error for TransportError {}

/// Errors returned to the embedder of a reporter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReporterError {
    /// The operation is not valid in the current lifecycle state
    State(String),
    /// A custom data bound was violated
    Validation(String),
    /// A report could not be delivered
    Transport(TransportError),
}

impl ReporterError {
    pub fn is_state(&self) -> bool {
        matches!(self, ReporterError::State(_))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ReporterError::Validation(_))
    }
}

impl fmt::Display for ReporterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReporterError::State(msg) => write!(f, "invalid state: {}", msg),
            ReporterError::Validation(msg) => write!(f, "invalid custom data: {}", msg),
            ReporterError::Transport(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ReporterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReporterError::Transport(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TransportError> for ReporterError {
    fn from(e: TransportError) -> Self {
        ReporterError::Transport(e)
    }
}
