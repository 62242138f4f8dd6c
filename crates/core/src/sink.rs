//! Result sink trait and implementations
//!
//! Completed operations are handed to a `ResultSink` exactly once, in the
//! same step that removes them from the registry.

use std::io::Write;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::types::OperationResult;

/// Trait for result delivery targets
///
/// Implementations include:
/// - `TerminalSink` - human-readable or JSONL output to a writer
/// - `ChannelSink` - unbounded channel for programmatic consumers
pub trait ResultSink: Send + Sync {
    /// Emit a completed operation to this sink
    fn emit(&self, result: &OperationResult) -> Result<(), SinkError>;
}

/// Error type for result sink operations
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Channel send error: {0}")]
    Channel(String),
}

/// Output layout for [`TerminalSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// `Voice ID: <id>` followed by one tab-separated line per segment
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "json" => Ok(ReportFormat::Json),
            other => Err(format!("unknown report format '{}', expected text or json", other)),
        }
    }
}

/// Writer-backed sink
pub struct TerminalSink<W: Write + Send> {
    writer: Mutex<W>,
    format: ReportFormat,
}

impl<W: Write + Send> TerminalSink<W> {
    /// Create a new terminal sink writing to the specified output
    pub fn new(writer: W, format: ReportFormat) -> Self {
        Self {
            writer: Mutex::new(writer),
            format,
        }
    }

    /// Give back the underlying writer
    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl TerminalSink<std::io::Stdout> {
    /// Create a terminal sink writing to stdout
    pub fn stdout(format: ReportFormat) -> Self {
        Self::new(std::io::stdout(), format)
    }
}

impl<W: Write + Send> ResultSink for TerminalSink<W> {
    fn emit(&self, result: &OperationResult) -> Result<(), SinkError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| SinkError::Io(std::io::Error::other("writer lock poisoned")))?;

        match self.format {
            ReportFormat::Text => {
                writeln!(writer, "Voice ID: {}", result.id)?;
                for segment in &result.segments {
                    writeln!(
                        writer,
                        "\t{:.6}-{:.6}\t{}",
                        segment.time_start,
                        segment.time_end,
                        segment.best_transcript()
                    )?;
                }
            }
            ReportFormat::Json => {
                let line = serde_json::to_string(result)
                    .map_err(|e| SinkError::Serialization(e.to_string()))?;
                writeln!(writer, "{}", line)?;
            }
        }

        writer.flush()?;
        Ok(())
    }
}

/// Channel sink delivering results to a receiver
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<OperationResult>,
}

impl ChannelSink {
    /// Create a new channel sink and its receiver
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OperationResult>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ResultSink for ChannelSink {
    fn emit(&self, result: &OperationResult) -> Result<(), SinkError> {
        self.sender
            .send(result.clone())
            .map_err(|e| SinkError::Channel(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Alternative, OperationId, TranscriptionSegment};

    fn sample_result() -> OperationResult {
        OperationResult::with_segments(
            OperationId(12),
            vec![
                TranscriptionSegment {
                    time_start: 0.0,
                    time_end: 1.25,
                    speaker_id: 0,
                    alternatives: vec![Alternative {
                        transcript: "testing one two".into(),
                        confidence: 0.9,
                    }],
                },
                TranscriptionSegment {
                    time_start: 1.25,
                    time_end: 2.0,
                    speaker_id: 1,
                    alternatives: vec![],
                },
            ],
        )
    }

    #[test]
    fn test_text_format() {
        let sink = TerminalSink::new(Vec::new(), ReportFormat::Text);
        sink.emit(&sample_result()).unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Voice ID: 12");
        assert_eq!(lines[1], "\t0.000000-1.250000\ttesting one two");
        assert_eq!(lines[2], "\t1.250000-2.000000\t");
    }

    #[test]
    fn test_json_format() {
        let sink = TerminalSink::new(Vec::new(), ReportFormat::Json);
        sink.emit(&sample_result()).unwrap();
        sink.emit(&sample_result()).unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: OperationResult = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed, sample_result());
    }

    #[test]
    fn test_report_format_from_str() {
        assert_eq!("text".parse::<ReportFormat>(), Ok(ReportFormat::Text));
        assert_eq!("Json".parse::<ReportFormat>(), Ok(ReportFormat::Json));
        assert!("yaml".parse::<ReportFormat>().is_err());
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (sink, mut receiver) = ChannelSink::new();
        sink.emit(&sample_result()).unwrap();

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.id, OperationId(12));
    }

    #[test]
    fn test_channel_sink_closed_receiver() {
        let (sink, receiver) = ChannelSink::new();
        drop(receiver);
        assert!(matches!(
            sink.emit(&sample_result()),
            Err(SinkError::Channel(_))
        ));
    }
}
