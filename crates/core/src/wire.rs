//! JSON wire schema of the recognition service
//!
//! - POST submit: body [`LongRunningRecognizeRequest`], answer `{ "operation_id": u64 }`
//! - GET status: answer [`FetchOperationResponse`]
//!
//! Binary fields travel as standard base64 inside JSON strings.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ServiceError;
use crate::types::{
    null_as_empty, OperationId, OperationResult, PollOutcome, Speaker, TranscriptionSegment,
};

/// `processing_status` value reported once recognition has finished
pub const PROCESSING_COMPLETED: &str = "PROCESSING_COMPLETED";

/// Request body for the submit endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongRunningRecognizeRequest {
    /// Raw audio file contents
    #[serde(serialize_with = "to_base64", deserialize_with = "from_base64")]
    pub signal: Vec<u8>,
    /// BCP-47 language tag, e.g. "en-US"
    pub language_code: String,
    /// Use the slower, more exhaustive decoder
    pub execute_beam_search: bool,
}

/// Response body from the submit endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongRunningRecognizeResponse {
    pub operation_id: u64,
}

/// Response body from the status endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchOperationResponse {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub language_code: String,
    #[serde(default)]
    pub beam_search: bool,
    pub processing_status: String,
    #[serde(default)]
    pub processing_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub processing_finished_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub speakers: Vec<Speaker>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub transcriptions: Vec<TranscriptionSegment>,
}

impl FetchOperationResponse {
    /// Whether the remote service has finished processing
    pub fn is_completed(&self) -> bool {
        self.processing_status == PROCESSING_COMPLETED
    }

    /// Convert into a poll outcome for operation `id`
    ///
    /// The id we polled with wins over the one echoed in the body.
    pub fn into_outcome(self, id: OperationId) -> PollOutcome {
        if !self.is_completed() {
            return PollOutcome::Pending;
        }

        PollOutcome::Complete(OperationResult {
            id,
            language_code: self.language_code,
            beam_search: self.beam_search,
            processing_started_at: self.processing_started_at,
            processing_finished_at: self.processing_finished_at,
            speakers: self.speakers,
            segments: self.transcriptions,
        })
    }
}

/// Decode a successful submit response
pub fn decode_submit_response(body: &[u8]) -> Result<OperationId, ServiceError> {
    let response: LongRunningRecognizeResponse = serde_json::from_slice(body)
        .map_err(|e| ServiceError::Decode(format!("Invalid submit response: {}", e)))?;
    Ok(OperationId(response.operation_id))
}

/// Decode a successful status response for operation `id`
pub fn decode_status_response(id: OperationId, body: &[u8]) -> Result<PollOutcome, ServiceError> {
    let response: FetchOperationResponse = serde_json::from_slice(body)
        .map_err(|e| ServiceError::Decode(format!("Invalid status response: {}", e)))?;
    Ok(response.into_outcome(id))
}

fn to_base64<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}

fn from_base64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD.decode(encoded).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_signal_is_base64() {
        let request = LongRunningRecognizeRequest {
            signal: b"fLaC".to_vec(),
            language_code: "en-US".into(),
            execute_beam_search: false,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["signal"], "ZkxhQw==");
        assert_eq!(json["language_code"], "en-US");
        assert_eq!(json["execute_beam_search"], false);
    }

    #[test]
    fn test_decode_submit_response() {
        let id = decode_submit_response(br#"{"operation_id": 4242}"#).unwrap();
        assert_eq!(id, OperationId(4242));
    }

    #[test]
    fn test_decode_submit_response_rejects_garbage() {
        let err = decode_submit_response(b"<html>502 Bad Gateway</html>").unwrap_err();
        assert!(matches!(err, ServiceError::Decode(_)));
    }

    #[test]
    fn test_decode_status_pending() {
        let body = br#"{"id": 7, "processing_status": "PROCESSING_IN_PROGRESS", "transcriptions": null}"#;
        let outcome = decode_status_response(OperationId(7), body).unwrap();
        assert_eq!(outcome, PollOutcome::Pending);
    }

    #[test]
    fn test_decode_status_completed() {
        let body = br#"{
            "id": 7,
            "language_code": "en-US",
            "beam_search": false,
            "processing_status": "PROCESSING_COMPLETED",
            "processing_started_at": "2024-03-01T10:00:00Z",
            "processing_finished_at": "2024-03-01T10:00:02.5Z",
            "speakers": [{"id": 0, "gender": "female"}],
            "transcriptions": [
                {
                    "time_start": 0.0,
                    "time_end": 2.25,
                    "speaker_id": 0,
                    "alternatives": [{"transcript": "good morning", "confidence": 0.97}]
                }
            ]
        }"#;

        let outcome = decode_status_response(OperationId(7), body).unwrap();
        let PollOutcome::Complete(result) = outcome else {
            panic!("expected a completed outcome");
        };
        assert_eq!(result.id, OperationId(7));
        assert_eq!(result.language_code, "en-US");
        assert_eq!(result.speakers.len(), 1);
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].best_transcript(), "good morning");
        assert!(result.processing_finished_at > result.processing_started_at);
    }

    #[test]
    fn test_decode_status_completed_without_transcriptions() {
        let body = br#"{"processing_status": "PROCESSING_COMPLETED"}"#;
        let outcome = decode_status_response(OperationId(1), body).unwrap();
        match outcome {
            PollOutcome::Complete(result) => assert!(result.segments.is_empty()),
            PollOutcome::Pending => panic!("expected a completed outcome"),
        }
    }

    #[test]
    fn test_decode_status_completed_with_null_alternatives() {
        let body = br#"{
            "id": 3,
            "processing_status": "PROCESSING_COMPLETED",
            "transcriptions": [
                {"time_start": 0.0, "time_end": 0.4, "speaker_id": 0, "alternatives": null},
                {"time_start": 0.4, "time_end": 1.1, "speaker_id": 0, "alternatives": [{"transcript": "yes", "confidence": 0.88}]}
            ]
        }"#;

        let outcome = decode_status_response(OperationId(3), body).unwrap();
        let PollOutcome::Complete(result) = outcome else {
            panic!("expected a completed outcome");
        };
        assert_eq!(result.segments.len(), 2);
        assert!(result.segments[0].alternatives.is_empty());
        assert_eq!(result.segments[0].best_transcript(), "");
        assert_eq!(result.segments[1].best_transcript(), "yes");
    }

    #[test]
    fn test_decode_status_missing_status_is_decode_error() {
        let err = decode_status_response(OperationId(1), br#"{"id": 1}"#).unwrap_err();
        assert!(err.is_terminal_for_polling());
    }
}
