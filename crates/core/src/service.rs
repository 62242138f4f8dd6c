//! Boundary with the remote recognition service
//!
//! The dispatcher and poller only talk to the service through this trait;
//! `asr-loadgen-http` provides the HTTP implementation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::types::{OperationId, PollOutcome, SubmissionRequest};

/// Remote long-running recognition service
#[async_trait]
pub trait RecognitionService: Send + Sync {
    /// Submit a recognition request
    ///
    /// Succeeds only when the service accepted the request and returned a
    /// decodable operation id.
    async fn submit(&self, request: &SubmissionRequest) -> Result<OperationId, ServiceError>;

    /// Fetch the current status of an operation
    async fn fetch_status(&self, id: OperationId) -> Result<PollOutcome, ServiceError>;
}

#[async_trait]
impl<T: RecognitionService + ?Sized> RecognitionService for Arc<T> {
    async fn submit(&self, request: &SubmissionRequest) -> Result<OperationId, ServiceError> {
        (**self).submit(request).await
    }

    async fn fetch_status(&self, id: OperationId) -> Result<PollOutcome, ServiceError> {
        (**self).fetch_status(id).await
    }
}
