//! Speech-to-text transcription via the external recognition service.

mod client;

pub use client::{
    transcribe, ServiceError, TranscribeOptions, TranscriptionError, TranscriptionOutcome,
    DEFAULT_SERVICE_URL,
};
