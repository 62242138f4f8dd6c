//! Completion poller
//!
//! Sweeps the registry, fetching the status of every pending operation,
//! until nothing is left. Per fetch:
//!
//! | outcome                    | action                           |
//! |----------------------------|----------------------------------|
//! | transport/protocol failure | keep, retried next sweep         |
//! | decode failure             | drop, never retried              |
//! | pending                    | keep                             |
//! | complete                   | remove, emit to the sink once    |
//!
//! Polling is unbounded unless `max_sweeps` or `timeout` is configured. An
//! operation the service never finishes keeps an unbounded poller busy
//! forever.

use std::pin::pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

use crate::error::ServiceError;
use crate::registry::OperationRegistry;
use crate::service::RecognitionService;
use crate::sink::ResultSink;
use crate::types::{OperationId, PollOutcome};

/// Default pause between sweeps
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Poller tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerConfig {
    /// Pause between two sweeps
    pub interval: Duration,
    /// Status fetches allowed in flight within one sweep (at least 1)
    pub fetch_concurrency: usize,
    /// Give up after this many sweeps
    pub max_sweeps: Option<u32>,
    /// Give up once this much time has passed since polling started
    pub timeout: Option<Duration>,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            fetch_concurrency: 1,
            max_sweeps: None,
            timeout: None,
        }
    }
}

/// Counters for one polling run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Sweeps performed
    pub sweeps: u32,
    /// Operations that completed and were emitted
    pub completed: usize,
    /// Operations dropped because their status could not be decoded
    pub decode_failures: usize,
    /// Fetches that failed and were left for the next sweep
    pub transport_failures: usize,
    /// Operations still pending when a sweep or time bound stopped polling
    pub abandoned: Vec<OperationId>,
    /// Wall time of the polling run
    pub elapsed: Duration,
}

impl PollReport {
    /// Whether every operation was resolved
    pub fn is_drained(&self) -> bool {
        self.abandoned.is_empty()
    }

    fn begin_sweep(&mut self) {
        self.sweeps = self.sweeps.saturating_add(1);
    }
}

/// Polls pending operations until they resolve
pub struct CompletionPoller {
    service: Arc<dyn RecognitionService>,
    sink: Arc<dyn ResultSink>,
    config: PollerConfig,
}

impl CompletionPoller {
    /// Create a poller
    pub fn new(
        service: Arc<dyn RecognitionService>,
        sink: Arc<dyn ResultSink>,
        config: PollerConfig,
    ) -> Self {
        Self {
            service,
            sink,
            config,
        }
    }

    /// Sweep until the registry is empty or a configured bound is hit
    pub async fn poll_until_done(&self, registry: &OperationRegistry) -> PollReport {
        let started = Instant::now();
        let mut report = PollReport::default();

        while !registry.is_empty() {
            report.begin_sweep();
            self.sweep(registry, &mut report).await;

            let remaining = registry.len();
            if remaining == 0 {
                break;
            }

            debug!(sweep = report.sweeps, remaining, "Sweep finished");

            if self.bound_reached(&report, started) {
                report.abandoned = registry.pending_ids();
                warn!(
                    sweeps = report.sweeps,
                    abandoned = report.abandoned.len(),
                    "Polling bound reached with operations still pending"
                );
                break;
            }

            tokio::time::sleep(self.config.interval).await;
        }

        report.elapsed = started.elapsed();
        info!(
            sweeps = report.sweeps,
            completed = report.completed,
            decode_failures = report.decode_failures,
            abandoned = report.abandoned.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Polling finished"
        );
        report
    }

    fn bound_reached(&self, report: &PollReport, started: Instant) -> bool {
        let sweeps_exhausted = self
            .config
            .max_sweeps
            .is_some_and(|max| report.sweeps >= max);
        let timed_out = self
            .config
            .timeout
            .is_some_and(|timeout| started.elapsed() >= timeout);
        sweeps_exhausted || timed_out
    }

    /// One pass over a snapshot of the pending operations
    async fn sweep(&self, registry: &OperationRegistry, report: &mut PollReport) {
        let mut ids = Vec::with_capacity(registry.len());
        registry.for_each_pending(|record| ids.push(record.id));
        let concurrency = self.config.fetch_concurrency.max(1);

        let mut fetches = pin!(stream::iter(ids)
            .map(|id| {
                let service = Arc::clone(&self.service);
                async move { (id, service.fetch_status(id).await) }
            })
            .buffer_unordered(concurrency));

        while let Some((id, fetched)) = fetches.next().await {
            registry.record_poll(id);
            self.apply(registry, id, fetched, report);
        }
    }

    fn apply(
        &self,
        registry: &OperationRegistry,
        id: OperationId,
        fetched: Result<PollOutcome, ServiceError>,
        report: &mut PollReport,
    ) {
        match fetched {
            Ok(PollOutcome::Pending) => {
                debug!(operation_id = %id, "Operation still processing");
            }
            Ok(PollOutcome::Complete(result)) => {
                // Only the caller that removes the record reports it
                let Some(record) = registry.remove(id) else {
                    return;
                };
                debug!(
                    operation_id = %id,
                    polls = record.polls,
                    age_ms = record.age().as_millis() as u64,
                    "Operation completed"
                );
                report.completed += 1;
                if let Err(e) = self.sink.emit(&result) {
                    error!(operation_id = %id, "Failed to report operation result: {}", e);
                }
            }
            Err(e) if e.is_terminal_for_polling() => {
                warn!(operation_id = %id, "Failed to deserialize fetching response: {}", e);
                if registry.remove(id).is_some() {
                    report.decode_failures += 1;
                }
            }
            Err(e) => {
                warn!(operation_id = %id, "Failed to fetch an operation state: {}", e);
                report.transport_failures += 1;
            }
        }
    }
}
