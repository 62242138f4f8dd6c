//! HTTP client for the long-running recognition service
//!
//! - Submission via POST `<base_url><submit_path>`
//! - Status via GET `<base_url><operations_path><operation_id>`
//!
//! # Usage
//!
//! ```ignore
//! use asr_loadgen_http::{ClientOptions, HttpRecognitionClient};
//!
//! let client = HttpRecognitionClient::new("https://asr.sapiensapi.com", ClientOptions::default())?;
//! let id = client.submit(&request).await?;
//! let outcome = client.fetch_status(id).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use asr_loadgen_core::wire::{decode_status_response, decode_submit_response};
use asr_loadgen_core::{
    LoadGenConfig, OperationId, PollOutcome, RecognitionService, ServiceError, SubmissionRequest,
};

use crate::error::{Error, Result};

/// Content type the service expects on submissions
const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";

/// Endpoint layout and timeouts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Path of the submit endpoint
    pub submit_path: String,
    /// Path prefix of the status endpoint
    pub operations_path: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            submit_path: "/v1/speech:longrunningrecognize".to_string(),
            operations_path: "/v1/operations/".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientOptions {
    /// Options taken from a load generator configuration
    pub fn from_config(config: &LoadGenConfig) -> Self {
        Self {
            submit_path: config.submit_path.clone(),
            operations_path: config.operations_path.clone(),
            timeout: config.request_timeout(),
        }
    }
}

/// HTTP implementation of [`RecognitionService`]
///
/// Holds one pooled `reqwest::Client`; clone it freely across tasks.
#[derive(Debug, Clone)]
pub struct HttpRecognitionClient {
    /// Full submit URL
    submit_url: String,

    /// Status URL prefix, the operation id is appended
    operations_url: String,

    /// Reqwest HTTP client
    client: reqwest::Client,
}

impl HttpRecognitionClient {
    /// Create a new HTTP client
    ///
    /// # Arguments
    ///
    /// * `base_url` - Service base URL (e.g., "http://localhost:50120")
    /// * `options` - Endpoint paths and request timeout
    ///
    /// # Errors
    ///
    /// Fails if `base_url` is empty or not http(s), or if the underlying
    /// client cannot be built.
    pub fn new(base_url: impl Into<String>, options: ClientOptions) -> Result<Self> {
        let base_url = base_url.into();

        // Validate base URL format
        if base_url.is_empty() {
            return Err(Error::ConnectionError(
                "HTTP base_url cannot be empty".to_string(),
            ));
        }

        // Ensure base URL starts with http:// or https://
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::ConnectionError(format!(
                "HTTP base_url must start with http:// or https://, got: {}",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()?;

        Ok(Self {
            submit_url: join_url(&base_url, &options.submit_path),
            operations_url: join_url(&base_url, &options.operations_path),
            client,
        })
    }

    /// Create a client from a load generator configuration
    pub fn from_config(config: &LoadGenConfig) -> Result<Self> {
        Self::new(config.base_url.clone(), ClientOptions::from_config(config))
    }

    /// Full submit URL
    pub fn submit_url(&self) -> &str {
        &self.submit_url
    }

    /// Status URL for operation `id`
    pub fn status_url(&self, id: OperationId) -> String {
        format!("{}{}", self.operations_url, id)
    }
}

/// Turn a response into its body bytes, or a protocol error with the raw text
async fn success_body(response: reqwest::Response) -> std::result::Result<bytes::Bytes, ServiceError> {
    let status = response.status();

    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ServiceError::Protocol {
            status: status.as_u16(),
            body,
        });
    }

    response
        .bytes()
        .await
        .map_err(|e| ServiceError::Transport(format!("Failed to read response body: {}", e)))
}

#[async_trait]
impl RecognitionService for HttpRecognitionClient {
    async fn submit(&self, request: &SubmissionRequest) -> std::result::Result<OperationId, ServiceError> {
        let response = self
            .client
            .post(&self.submit_url)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(request.body().clone())
            .send()
            .await
            .map_err(|e| ServiceError::Transport(format!("HTTP request failed: {}", e)))?;

        let body = success_body(response).await?;
        decode_submit_response(&body)
    }

    async fn fetch_status(&self, id: OperationId) -> std::result::Result<PollOutcome, ServiceError> {
        let url = self.status_url(id);
        tracing::debug!(operation_id = %id, url = %url, "Fetching operation state");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(format!("HTTP request failed: {}", e)))?;

        let body = success_body(response).await?;
        decode_status_response(id, &body)
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.is_empty() {
        base.to_string()
    } else if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}
