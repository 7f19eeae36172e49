//! Core audio subsystems for an AAC (augmentative and alternative
//! communication) app: an audio capture-and-normalization pipeline that turns
//! microphone input into canonical 16-bit PCM WAV for transcription, and a
//! sequential speech-playback scheduler that serializes text-to-speech
//! utterances.
//!
//! Both subsystems are event-driven: callers hold an [`audio::CaptureHandle`]
//! or [`speech::SpeechHandle`] and progress arrives as asynchronous notices
//! and signals on a single task per subsystem. No failure in either
//! subsystem is fatal; the worst outcome is one dropped recording or one
//! skipped utterance.

pub mod audio;
pub mod config;
pub mod speech;
pub mod transcription;
pub mod wav;

pub use audio::{CaptureHandle, CaptureNotice, EncodedAudioBlob};
pub use speech::{SpeechHandle, SynthesisEngine, VoiceRef};
pub use transcription::{TranscribeOptions, TranscriptionOutcome};
