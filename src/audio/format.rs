//! Recording format negotiation.
//!
//! Picks the best supported recording encoding from a ranked candidate list.
//! Pure function of the backend's capability set; no state.

/// Ranked candidates, most compressed and most widely decodable first.
pub const RECORDING_FORMAT_CANDIDATES: &[&str] = &[
    "audio/webm;codecs=opus",
    "audio/webm",
    "audio/ogg;codecs=opus",
    "audio/wav",
];

/// Return the first candidate the backend reports as supported, or `None`
/// when nothing is explicitly supported (the backend's own default is used).
pub fn negotiate_recording_format<'a>(
    candidates: &[&'a str],
    is_supported: impl Fn(&str) -> bool,
) -> Option<&'a str> {
    candidates.iter().copied().find(|c| is_supported(c))
}
