//! Load generator core for long-running speech recognition services
//!
//! Submits a fixed audio payload many times under a concurrency ceiling,
//! tracks the operations the service accepts, and polls them until they
//! resolve.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use asr_loadgen_core::{LoadTest, ReportFormat, RunParams, SessionConfig, SubmissionRequest, TerminalSink};
//!
//! let request = SubmissionRequest::encode(audio, "en-US", false)?;
//! let sink = Arc::new(TerminalSink::stdout(ReportFormat::Text));
//! let load_test = LoadTest::new(service, sink, SessionConfig::default());
//!
//! let summary = load_test.run(&request, RunParams::new(100, 8)?).await;
//! println!("accepted {}", summary.dispatch.accepted);
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod poller;
pub mod registry;
pub mod service;
pub mod session;
pub mod sink;
pub mod types;
pub mod wire;

// Re-export main types
pub use config::LoadGenConfig;
pub use dispatcher::{DispatchOutcome, DispatchReport, Dispatcher};
pub use error::{Error, Result, ServiceError};
pub use poller::{CompletionPoller, PollReport, PollerConfig};
pub use registry::{OperationRecord, OperationRegistry};
pub use service::RecognitionService;
pub use session::{LoadTest, SessionConfig, SessionSummary};
pub use sink::{ChannelSink, ReportFormat, ResultSink, SinkError, TerminalSink};
pub use types::{
    Alternative, OperationId, OperationResult, PollOutcome, RunParams, Speaker,
    SubmissionRequest, TranscriptionSegment,
};
