//! Encoded audio blobs produced by capture and consumed by the WAV encoder.

/// An opaque encoded audio buffer tagged with its MIME type.
///
/// Produced by assembling the chunks of one recording session; immutable once
/// finalized. The tag is whatever encoding the recording backend actually
/// used (e.g. "audio/webm", "audio/wav").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAudioBlob {
    bytes: Vec<u8>,
    mime_type: String,
}

impl EncodedAudioBlob {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Assemble the chunks of one recording session, in delivery order,
    /// into a single blob tagged with the encoding actually used.
    pub fn assemble(chunks: &[Vec<u8>], mime_type: &str) -> Self {
        let total: usize = chunks.iter().map(|c| c.len()).sum();
        let mut bytes = Vec::with_capacity(total);
        for chunk in chunks {
            bytes.extend_from_slice(chunk);
        }
        Self::new(bytes, mime_type)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// True when the declared MIME type already indicates WAV, in which case
    /// the encoder passes the bytes through untouched.
    pub fn is_wav(&self) -> bool {
        let tag = self
            .mime_type
            .split(';')
            .next()
            .unwrap_or(&self.mime_type)
            .trim();
        tag.eq_ignore_ascii_case("audio/wav") || tag.eq_ignore_ascii_case("audio/x-wav")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assemble_preserves_chunk_order() {
        let chunks = vec![vec![1u8, 2], vec![3], vec![4, 5, 6]];
        let blob = EncodedAudioBlob::assemble(&chunks, "audio/webm");
        assert_eq!(blob.bytes(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(blob.mime_type(), "audio/webm");
    }

    #[test]
    fn wav_tag_detection() {
        assert!(EncodedAudioBlob::new(vec![], "audio/wav").is_wav());
        assert!(EncodedAudioBlob::new(vec![], "audio/x-wav").is_wav());
        assert!(EncodedAudioBlob::new(vec![], "audio/wav;codecs=1").is_wav());
        assert!(!EncodedAudioBlob::new(vec![], "audio/webm").is_wav());
        assert!(!EncodedAudioBlob::new(vec![], "audio/ogg;codecs=opus").is_wav());
    }
}
