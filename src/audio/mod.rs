//! Audio capture pipeline.
//!
//! Owns the recording session state machine and the microphone backend.
//! Uses CPAL for capture and hound for WAV writing; assembled recordings are
//! normalized by the [`crate::wav`] encoder before transcription.

mod blob;
pub mod capture;
pub mod format;
mod paths;
pub mod recorder;
pub mod state;

pub use blob::EncodedAudioBlob;
pub use capture::{
    spawn_capture_loop, CaptureHandle, CaptureNotice, CapturePhase, RecordingBackend, WAV_MIME,
};
pub use format::{negotiate_recording_format, RECORDING_FORMAT_CANDIDATES};
pub use paths::{cleanup_stale_recordings, create_temp_audio_dir, generate_wav_path};
pub use recorder::CpalRecorder;
pub use state::CaptureError;
