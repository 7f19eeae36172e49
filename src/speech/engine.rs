//! Synthesis engine collaborator interface.

use tokio::sync::mpsc;
use uuid::Uuid;

use super::voice::VoiceRef;

/// Synchronous dispatch failure: the platform refused to start speaking.
#[derive(Debug, Clone)]
pub struct SpeakError(pub String);

impl std::fmt::Display for SpeakError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Speech dispatch failed: {}", self.0)
    }
}

impl std::error::Error for SpeakError {}

/// Asynchronous completion signals emitted by the engine for an utterance
/// it accepted. The id echoes the one passed to `speak`.
#[derive(Debug, Clone)]
pub enum SpeechSignal {
    Ended { id: Uuid },
    Errored { id: Uuid, message: String },
}

/// Platform speech synthesis engine.
///
/// `speak` either accepts the utterance (an `Ended` or `Errored` signal
/// arrives later on `signals`) or fails synchronously. The voice list is
/// queried fresh on every call; platforms may populate it asynchronously.
pub trait SynthesisEngine: Send + Sync + 'static {
    fn speak(
        &self,
        id: Uuid,
        text: &str,
        voice: Option<&VoiceRef>,
        signals: mpsc::Sender<SpeechSignal>,
    ) -> Result<(), SpeakError>;

    /// Cancel the current utterance immediately.
    fn cancel(&self);

    fn voices(&self) -> Vec<VoiceRef>;
}
