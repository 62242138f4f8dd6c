//! Data model shared by the dispatcher, registry and poller

use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};
use crate::wire::LongRunningRecognizeRequest;

/// Smallest accepted number of submissions per session
pub const MIN_ITERATIONS: u32 = 1;

/// Largest accepted number of submissions per session
pub const MAX_ITERATIONS: u32 = 1000;

/// Smallest accepted concurrency ceiling
pub const MIN_CONCURRENCY: u32 = 1;

/// Largest accepted concurrency ceiling
pub const MAX_CONCURRENCY: u32 = 64;

/// Handle assigned by the remote service to one accepted submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(pub u64);

impl OperationId {
    /// Raw numeric value
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for OperationId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Pre-serialized recognition request
///
/// Built once per session and shared by every submission attempt. Cloning
/// only bumps a reference count on the underlying buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    body: Bytes,
}

impl SubmissionRequest {
    /// Serialize the audio signal and recognition options into a request body
    pub fn encode(
        audio: impl AsRef<[u8]>,
        language_code: impl Into<String>,
        execute_beam_search: bool,
    ) -> Result<Self> {
        let request = LongRunningRecognizeRequest {
            signal: audio.as_ref().to_vec(),
            language_code: language_code.into(),
            execute_beam_search,
        };
        let body = serde_json::to_vec(&request)?;
        Ok(Self {
            body: Bytes::from(body),
        })
    }

    /// Serialized request body
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body size in bytes
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Whether the body is empty
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Validated parameters for one dispatch round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunParams {
    iterations: u32,
    concurrency: u32,
}

impl RunParams {
    /// Create run parameters
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `iterations` is outside 1-1000 or
    /// `concurrency` is outside 1-64.
    pub fn new(iterations: u32, concurrency: u32) -> Result<Self> {
        Self::check_iterations(iterations)?;
        Self::check_concurrency(concurrency)?;
        Ok(Self {
            iterations,
            concurrency,
        })
    }

    /// Validate an iteration count on its own
    pub fn check_iterations(iterations: u32) -> Result<u32> {
        if !(MIN_ITERATIONS..=MAX_ITERATIONS).contains(&iterations) {
            return Err(Error::Validation(format!(
                "Uploading iterations must be in range between {} and {}.",
                MIN_ITERATIONS, MAX_ITERATIONS
            )));
        }
        Ok(iterations)
    }

    /// Validate a concurrency ceiling on its own
    pub fn check_concurrency(concurrency: u32) -> Result<u32> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(Error::Validation(format!(
                "Uploading concurrency must be in range between {} and {}.",
                MIN_CONCURRENCY, MAX_CONCURRENCY
            )));
        }
        Ok(concurrency)
    }

    /// Number of submission attempts
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Maximum simultaneously outstanding attempts
    pub fn concurrency(&self) -> u32 {
        self.concurrency
    }
}

/// One recognition hypothesis for a segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    /// Recognized text
    #[serde(default)]
    pub transcript: String,
    /// Confidence in 0.0-1.0
    #[serde(default)]
    pub confidence: f32,
}

/// A time-bounded piece of a transcription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionSegment {
    /// Segment start in seconds
    #[serde(default)]
    pub time_start: f32,
    /// Segment end in seconds
    #[serde(default)]
    pub time_end: f32,
    /// Diarized speaker
    #[serde(default)]
    pub speaker_id: u32,
    /// Hypotheses, best first
    #[serde(default, deserialize_with = "null_as_empty")]
    pub alternatives: Vec<Alternative>,
}

impl TranscriptionSegment {
    /// Text of the first alternative, or an empty string
    pub fn best_transcript(&self) -> &str {
        self.alternatives
            .first()
            .map(|alt| alt.transcript.as_str())
            .unwrap_or("")
    }
}

/// Speaker detected in the audio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Speaker {
    /// Speaker id referenced by segments
    #[serde(default)]
    pub id: u32,
    /// Reported gender label
    #[serde(default)]
    pub gender: String,
}

/// Final state of a completed operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResult {
    pub id: OperationId,
    pub language_code: String,
    pub beam_search: bool,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub processing_finished_at: Option<DateTime<Utc>>,
    pub speakers: Vec<Speaker>,
    pub segments: Vec<TranscriptionSegment>,
}

impl OperationResult {
    /// Result with only an id and segments, everything else defaulted
    pub fn with_segments(id: OperationId, segments: Vec<TranscriptionSegment>) -> Self {
        Self {
            id,
            language_code: String::new(),
            beam_search: false,
            processing_started_at: None,
            processing_finished_at: None,
            speakers: Vec::new(),
            segments,
        }
    }
}

/// Decoded status of one operation
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Still being processed by the remote service
    Pending,
    /// Processing finished
    Complete(OperationResult),
}

// Services written against nil slices emit `null` for empty lists
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
