//! HTTP transport error types

use thiserror::Error;

/// HTTP transport error types
///
/// Only raised while building a client. Request failures are reported as
/// [`ServiceError`](asr_loadgen_core::ServiceError) through the service trait.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid base URL or endpoint path
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),
}

/// Result type for HTTP transport operations
pub type Result<T> = std::result::Result<T, Error>;
