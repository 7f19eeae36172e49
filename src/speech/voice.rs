//! Voice selection with ranked preferences and fallback.

use super::engine::SynthesisEngine;

/// Handle into the platform's voice set. Not owned by the queue; looked up
/// fresh each time a voice is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceRef {
    pub name: String,
    pub locale: String,
}

impl VoiceRef {
    pub fn new(name: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            locale: locale.into(),
        }
    }
}

/// Named voices tried in order before falling back to the first voice
/// matching the locale filter.
pub const PREFERRED_VOICES: &[&str] = &[
    "Google US English",
    "Samantha",
    "Microsoft Zira Desktop",
    "Microsoft Aria Online (Natural)",
    "Google US Female",
];

pub const DEFAULT_VOICE_LOCALE: &str = "en-US";

fn load_locale_voices(engine: &dyn SynthesisEngine, locale: &str) -> Vec<VoiceRef> {
    engine
        .voices()
        .into_iter()
        .filter(|v| v.locale.contains(locale))
        .collect()
}

/// Pick a synthesis voice, or `None` when no voice matching the locale is
/// available; the caller proceeds with the platform's implicit default.
///
/// Voice lists can populate asynchronously after the first query, so an
/// empty result triggers one re-query before giving up.
pub fn select_voice(engine: &dyn SynthesisEngine, locale: &str) -> Option<VoiceRef> {
    let mut voices = load_locale_voices(engine, locale);
    if voices.is_empty() {
        voices = load_locale_voices(engine, locale);
    }
    if voices.is_empty() {
        return None;
    }
    for name in PREFERRED_VOICES {
        if let Some(found) = voices.iter().find(|v| v.name == *name) {
            return Some(found.clone());
        }
    }
    voices.into_iter().next()
}
