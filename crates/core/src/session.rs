//! One load-test round: dispatch, warm up, poll to exhaustion

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::dispatcher::{DispatchReport, Dispatcher};
use crate::poller::{CompletionPoller, PollReport, PollerConfig};
use crate::service::RecognitionService;
use crate::sink::ResultSink;
use crate::types::{RunParams, SubmissionRequest};

/// Session tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Wait before the first sweep, multiplied by the accepted count
    pub warmup_per_operation: Duration,
    /// Cap on the total warm-up wait
    pub max_warmup: Option<Duration>,
    /// Poller settings
    pub poller: PollerConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            warmup_per_operation: Duration::from_secs(1),
            max_warmup: None,
            poller: PollerConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Warm-up wait for `accepted` operations
    pub fn warmup_for(&self, accepted: usize) -> Duration {
        let count = u32::try_from(accepted).unwrap_or(u32::MAX);
        let warmup = self.warmup_per_operation.saturating_mul(count);
        match self.max_warmup {
            Some(cap) => warmup.min(cap),
            None => warmup,
        }
    }
}

/// Outcome of one round
#[derive(Debug, Clone)]
pub struct SessionSummary {
    /// Submission counters
    pub dispatch: DispatchReport,
    /// Polling counters; `None` when nothing was accepted
    pub poll: Option<PollReport>,
}

impl SessionSummary {
    /// Whether no submission was accepted
    pub fn nothing_uploaded(&self) -> bool {
        self.poll.is_none()
    }
}

/// Runs load-test rounds against one service
pub struct LoadTest {
    dispatcher: Dispatcher,
    poller: CompletionPoller,
    config: SessionConfig,
}

impl LoadTest {
    /// Create a load test
    pub fn new(
        service: Arc<dyn RecognitionService>,
        sink: Arc<dyn ResultSink>,
        config: SessionConfig,
    ) -> Self {
        Self {
            dispatcher: Dispatcher::new(Arc::clone(&service)),
            poller: CompletionPoller::new(service, sink, config.poller.clone()),
            config,
        }
    }

    /// Run one round
    ///
    /// Nothing carries over between rounds: each gets a fresh registry.
    pub async fn run(&self, request: &SubmissionRequest, params: RunParams) -> SessionSummary {
        let outcome = self.dispatcher.dispatch(request, params).await;
        let accepted = outcome.registry.len();

        if accepted == 0 {
            info!("No voice has been successfully uploaded");
            return SessionSummary {
                dispatch: outcome.report,
                poll: None,
            };
        }

        info!("Uploaded {} voices. Fetching results...", accepted);

        let warmup = self.config.warmup_for(accepted);
        if !warmup.is_zero() {
            tokio::time::sleep(warmup).await;
        }

        let poll = self.poller.poll_until_done(&outcome.registry).await;

        SessionSummary {
            dispatch: outcome.report,
            poll: Some(poll),
        }
    }
}
