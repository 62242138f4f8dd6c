//! Submission dispatcher
//!
//! Issues a fixed number of submission attempts with a concurrency ceiling
//! and registers every operation the service accepts.
//!
//! The ceiling is enforced by a pool of `min(concurrency, iterations)` worker
//! tasks that pull attempt tickets from a shared counter. A worker only
//! starts its next attempt after the previous one finished, so the number of
//! outstanding submissions can never exceed the pool size.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::registry::OperationRegistry;
use crate::service::RecognitionService;
use crate::types::{RunParams, SubmissionRequest};

/// Counters for one dispatch round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Submission attempts started
    pub attempted: usize,
    /// Attempts that produced a newly registered operation
    pub accepted: usize,
    /// Attempts dropped on transport, protocol or decode errors
    pub failed: usize,
    /// Attempts whose operation id was already registered
    pub duplicates: usize,
    /// Highest number of simultaneously outstanding attempts
    pub peak_in_flight: usize,
    /// Wall time of the whole round
    pub elapsed: Duration,
}

/// Registry and counters produced by [`Dispatcher::dispatch`]
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// Pending operations, one per accepted attempt
    pub registry: OperationRegistry,
    /// Round counters
    pub report: DispatchReport,
}

#[derive(Debug, Default)]
struct DispatchState {
    next_ticket: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    accepted: AtomicUsize,
    failed: AtomicUsize,
    duplicates: AtomicUsize,
}

impl DispatchState {
    /// Claim the next attempt ticket, or `None` once all are handed out
    fn claim(&self, iterations: usize) -> Option<usize> {
        self.next_ticket
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |ticket| {
                (ticket < iterations).then_some(ticket + 1)
            })
            .ok()
    }

    fn enter(&self) -> InFlightGuard<'_> {
        let current = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::AcqRel);
        InFlightGuard {
            in_flight: &self.in_flight,
        }
    }
}

/// Decrements the in-flight counter when an attempt ends, panics included
struct InFlightGuard<'a> {
    in_flight: &'a AtomicUsize,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

/// Bounded-concurrency submitter
#[derive(Clone)]
pub struct Dispatcher {
    service: Arc<dyn RecognitionService>,
}

impl Dispatcher {
    /// Create a dispatcher over `service`
    pub fn new(service: Arc<dyn RecognitionService>) -> Self {
        Self { service }
    }

    /// Run exactly `params.iterations()` submission attempts
    ///
    /// Returns once every attempt has finished, successfully or not. Failed
    /// attempts are logged and dropped; there are no retries.
    pub async fn dispatch(&self, request: &SubmissionRequest, params: RunParams) -> DispatchOutcome {
        let iterations = params.iterations() as usize;
        let workers = params.concurrency().min(params.iterations()) as usize;
        let registry = OperationRegistry::new();
        let state = Arc::new(DispatchState::default());
        let started = Instant::now();

        info!(
            iterations,
            concurrency = params.concurrency(),
            request_bytes = request.len(),
            "Dispatching submissions"
        );

        let mut tasks = JoinSet::new();
        for worker in 0..workers {
            let service = Arc::clone(&self.service);
            let request = request.clone();
            let registry = registry.clone();
            let state = Arc::clone(&state);

            tasks.spawn(async move {
                run_worker(worker, service, request, registry, state, iterations).await;
            });
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Submission worker terminated abnormally: {}", e);
            }
        }

        let report = DispatchReport {
            attempted: state.next_ticket.load(Ordering::Acquire).min(iterations),
            accepted: state.accepted.load(Ordering::Acquire),
            failed: state.failed.load(Ordering::Acquire),
            duplicates: state.duplicates.load(Ordering::Acquire),
            peak_in_flight: state.peak_in_flight.load(Ordering::Acquire),
            elapsed: started.elapsed(),
        };

        info!(
            attempted = report.attempted,
            accepted = report.accepted,
            failed = report.failed,
            peak_in_flight = report.peak_in_flight,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Dispatch finished"
        );

        DispatchOutcome { registry, report }
    }
}

async fn run_worker(
    worker: usize,
    service: Arc<dyn RecognitionService>,
    request: SubmissionRequest,
    registry: OperationRegistry,
    state: Arc<DispatchState>,
    iterations: usize,
) {
    while let Some(ticket) = state.claim(iterations) {
        let _guard = state.enter();

        match service.submit(&request).await {
            Ok(id) => {
                if registry.insert(id) {
                    state.accepted.fetch_add(1, Ordering::AcqRel);
                    debug!(worker, ticket, operation_id = %id, "Submission accepted");
                } else {
                    state.duplicates.fetch_add(1, Ordering::AcqRel);
                    warn!(worker, ticket, operation_id = %id, "Service returned an operation id that is already tracked");
                }
            }
            Err(e) => {
                state.failed.fetch_add(1, Ordering::AcqRel);
                warn!(worker, ticket, "Failed to upload the voice data: {}", e);
            }
        }
    }
}
