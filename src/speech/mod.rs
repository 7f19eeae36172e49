//! Speech playback: voice selection and the utterance queue scheduler.

pub mod engine;
pub mod queue;
pub mod voice;

pub use engine::{SpeakError, SpeechSignal, SynthesisEngine};
pub use queue::{
    run_speech_loop, spawn_speech_loop, SpeechCommand, SpeechHandle, SpeechScheduler, Utterance,
    UtteranceState,
};
pub use voice::{select_voice, VoiceRef, DEFAULT_VOICE_LOCALE, PREFERRED_VOICES};
