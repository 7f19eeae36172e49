//! HTTP client for the speech recognition service.
//!
//! Posts the capture pipeline's payload as a multipart upload and returns
//! the service's structured transcription result.

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;

use crate::audio::EncodedAudioBlob;

/// Global HTTP client for reuse across requests (avoids TLS handshake overhead)
static HTTP_CLIENT: OnceLock<Client> = OnceLock::new();

fn get_http_client() -> &'static Client {
    HTTP_CLIENT.get_or_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to build HTTP client")
    })
}

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:5000/transcribe";

/// Options for a transcription request. Explicit named fields rather than an
/// open-ended bag; unset fields fall back to service defaults.
#[derive(Debug, Clone, Default)]
pub struct TranscribeOptions {
    /// Override for the service endpoint.
    pub service_url: Option<String>,
    /// Comma-separated selector restricting which recognition engines the
    /// service may use.
    pub engine_selector: Option<String>,
}

/// Errors that can occur during transcription
#[derive(Debug)]
pub enum TranscriptionError {
    /// Payload contained no audio bytes
    EmptyPayload,
    /// Network/HTTP error
    NetworkError(String),
    /// The service returned an error status
    ApiError { status: u16, message: String },
    /// Failed to parse the service response
    ParseError(String),
}

impl std::fmt::Display for TranscriptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptionError::EmptyPayload => write!(f, "No audio provided"),
            TranscriptionError::NetworkError(e) => write!(f, "Network error: {}", e),
            TranscriptionError::ApiError { status, message } => {
                write!(f, "Transcription service error ({}): {}", status, message)
            }
            TranscriptionError::ParseError(e) => {
                write!(f, "Failed to parse service response: {}", e)
            }
        }
    }
}

impl std::error::Error for TranscriptionError {}

/// Structured result returned by the service. Field names follow the
/// service's camelCase wire format.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionOutcome {
    pub success: bool,
    #[serde(rename = "transcription")]
    pub transcript: Option<String>,
    #[serde(rename = "confidenceScore")]
    pub confidence: Option<f64>,
    #[serde(rename = "aggregatedConfidenceScore")]
    pub aggregated_confidence: Option<f64>,
    #[serde(rename = "selectedApi")]
    pub selected_engine: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(rename = "sampleRate", default)]
    pub sample_rate: Option<u32>,
    #[serde(default)]
    pub error: Option<ServiceError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceError {
    pub code: String,
    pub message: String,
}

/// Send an audio payload to the transcription service.
///
/// The payload is whatever the capture pipeline finalized: canonical WAV in
/// the common case, or the original encoded blob when conversion fell back.
pub async fn transcribe(
    payload: &EncodedAudioBlob,
    options: &TranscribeOptions,
) -> Result<TranscriptionOutcome, TranscriptionError> {
    if payload.is_empty() {
        return Err(TranscriptionError::EmptyPayload);
    }

    let url = options
        .service_url
        .as_deref()
        .unwrap_or(DEFAULT_SERVICE_URL);
    log::info!(
        "Transcribing {} bytes of {} via {}",
        payload.len(),
        payload.mime_type(),
        url
    );

    let file_part = Part::bytes(payload.bytes().to_vec())
        .file_name("recording.wav")
        .mime_str(payload.mime_type())
        .map_err(|e| TranscriptionError::ParseError(e.to_string()))?;

    let mut form = Form::new().part("file", file_part);
    if let Some(selector) = &options.engine_selector {
        form = form.text("speechApis", selector.clone());
    }

    let response = get_http_client()
        .post(url)
        .multipart(form)
        .send()
        .await
        .map_err(|e| TranscriptionError::NetworkError(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
        let outcome: TranscriptionOutcome = response
            .json()
            .await
            .map_err(|e| TranscriptionError::ParseError(e.to_string()))?;
        log::info!(
            "Transcription {}: engine={:?}, confidence={:?}",
            if outcome.success { "succeeded" } else { "failed" },
            outcome.selected_engine,
            outcome.confidence
        );
        Ok(outcome)
    } else {
        let message = response.text().await.unwrap_or_default();
        log::error!("Transcription service error ({}): {}", status.as_u16(), message);
        Err(TranscriptionError::ApiError {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_payload_is_rejected_before_any_request() {
        let payload = EncodedAudioBlob::new(vec![], "audio/wav");
        let result = transcribe(&payload, &TranscribeOptions::default()).await;
        assert!(matches!(result, Err(TranscriptionError::EmptyPayload)));
    }

    #[test]
    fn outcome_parses_the_service_wire_format() {
        let json = r#"{
            "success": true,
            "transcription": "hello world",
            "confidenceScore": 0.92,
            "aggregatedConfidenceScore": 0.9,
            "selectedApi": "whisper",
            "duration": 1.5,
            "format": "wav",
            "sampleRate": 16000
        }"#;
        let outcome: TranscriptionOutcome = serde_json::from_str(json).unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.transcript.as_deref(), Some("hello world"));
        assert_eq!(outcome.confidence, Some(0.92));
        assert_eq!(outcome.selected_engine.as_deref(), Some("whisper"));
        assert_eq!(outcome.sample_rate, Some(16000));
        assert!(outcome.error.is_none());
    }

    #[test]
    fn outcome_parses_a_structured_error() {
        let json = r#"{
            "success": false,
            "transcription": null,
            "confidenceScore": null,
            "aggregatedConfidenceScore": null,
            "selectedApi": null,
            "error": { "code": "NO_SPEECH", "message": "no speech detected" }
        }"#;
        let outcome: TranscriptionOutcome = serde_json::from_str(json).unwrap();
        assert!(!outcome.success);
        assert!(outcome.transcript.is_none());
        let err = outcome.error.unwrap();
        assert_eq!(err.code, "NO_SPEECH");
        assert_eq!(err.message, "no speech detected");
    }

    #[test]
    fn error_display_formats_correctly() {
        let err = TranscriptionError::ApiError {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert!(err.to_string().contains("502"));
        assert!(err.to_string().contains("bad gateway"));
        assert!(TranscriptionError::EmptyPayload
            .to_string()
            .contains("No audio"));
    }
}
