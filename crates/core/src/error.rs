//! Error types for the load generator core

use thiserror::Error;

/// Result type alias for load generator core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by a [`RecognitionService`](crate::service::RecognitionService) call
///
/// None of these are fatal to a session: the dispatcher drops the attempt,
/// the poller either retries on the next sweep or gives the operation up.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// The remote service could not be reached (connect, timeout, broken body)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote service answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Protocol {
        /// HTTP status code
        status: u16,
        /// Raw response text
        body: String,
    },

    /// The response body does not match the expected schema
    #[error("Decode error: {0}")]
    Decode(String),
}

impl ServiceError {
    /// Whether the poller should stop tracking an operation after this error
    ///
    /// Only malformed payloads are terminal; transport and protocol failures
    /// are retried on the next sweep.
    pub fn is_terminal_for_polling(&self) -> bool {
        matches!(self, ServiceError::Decode(_))
    }
}

/// Error types that can occur in the load generator core
#[derive(Debug, Error)]
pub enum Error {
    /// Operator input outside the accepted ranges
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Remote service error
    #[error(transparent)]
    Service(#[from] ServiceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_decode_is_terminal() {
        assert!(ServiceError::Decode("bad json".into()).is_terminal_for_polling());
        assert!(!ServiceError::Transport("refused".into()).is_terminal_for_polling());
        assert!(!ServiceError::Protocol {
            status: 503,
            body: "busy".into()
        }
        .is_terminal_for_polling());
    }

    #[test]
    fn test_protocol_error_display_carries_body() {
        let err = ServiceError::Protocol {
            status: 400,
            body: "{\"error\":\"unsupported codec\"}".into(),
        };
        assert_eq!(err.to_string(), "HTTP 400: {\"error\":\"unsupported codec\"}");
    }
}
