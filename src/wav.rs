//! WAV normalization for transcription payloads.
//!
//! Decodes an arbitrary encoded audio blob into multi-channel f32 PCM and
//! re-encodes it as a canonical 44-byte-header 16-bit PCM WAV byte stream.
//! Blobs already tagged as WAV pass through byte-identical.

use std::io::Cursor;

use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

use crate::audio::EncodedAudioBlob;

/// Scale factor applied before quantization to avoid clipping artifacts.
const HEADROOM: f32 = 0.8;

const HEADER_LEN: usize = 44;
const BITS_PER_SAMPLE: u16 = 16;

#[derive(Debug, Clone)]
pub enum WavError {
    /// The blob could not be decoded (malformed or unsupported codec).
    /// Callers fall back to forwarding the original blob unconverted.
    DecodeFailed(String),
}

impl std::fmt::Display for WavError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WavError::DecodeFailed(e) => write!(f, "Failed to decode audio blob: {}", e),
        }
    }
}

impl std::error::Error for WavError {}

/// Decoded PCM audio, one sample array per channel, samples in [-1.0, 1.0].
/// Transient: owned solely by the encoding step that produced it.
#[derive(Debug, Clone)]
pub struct DecodedAudioBuffer {
    pub sample_rate: u32,
    pub channels: Vec<Vec<f32>>,
}

impl DecodedAudioBuffer {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Frame count, bounded by the shortest channel.
    pub fn frames(&self) -> usize {
        self.channels.iter().map(|c| c.len()).min().unwrap_or(0)
    }
}

/// Convert an encoded blob into canonical WAV bytes.
///
/// Blobs tagged `audio/wav` / `audio/x-wav` are returned unchanged; anything
/// else is decoded and re-encoded as interleaved 16-bit little-endian PCM.
pub fn encode(blob: &EncodedAudioBlob) -> Result<Vec<u8>, WavError> {
    if blob.is_wav() {
        return Ok(blob.bytes().to_vec());
    }
    let decoded = decode(blob)?;
    Ok(encode_pcm(&decoded))
}

/// Decode a blob into multi-channel f32 PCM via symphonia's probe.
pub fn decode(blob: &EncodedAudioBlob) -> Result<DecodedAudioBuffer, WavError> {
    let cursor = Cursor::new(blob.bytes().to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    hint.mime_type(blob.mime_type());

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| WavError::DecodeFailed(e.to_string()))?;
    let mut format = probed.format;

    let (track_id, codec_params) = {
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| WavError::DecodeFailed("no supported audio track".to_string()))?;
        (track.id, track.codec_params.clone())
    };

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| WavError::DecodeFailed(e.to_string()))?;

    let mut sample_rate = codec_params.sample_rate.unwrap_or(0);
    let mut channels: Vec<Vec<f32>> = Vec::new();

    while let Ok(packet) = format.next_packet() {
        if packet.track_id() != track_id {
            continue;
        }
        let buf = decoder
            .decode(&packet)
            .map_err(|e| WavError::DecodeFailed(e.to_string()))?;
        if sample_rate == 0 {
            sample_rate = buf.spec().rate;
        }
        match buf {
            AudioBufferRef::F32(buf) => append_channels(&mut channels, buf.as_ref()),
            AudioBufferRef::F64(buf) => append_channels(&mut channels, buf.as_ref()),
            AudioBufferRef::U8(buf) => append_channels(&mut channels, buf.as_ref()),
            AudioBufferRef::U16(buf) => append_channels(&mut channels, buf.as_ref()),
            AudioBufferRef::U32(buf) => append_channels(&mut channels, buf.as_ref()),
            AudioBufferRef::S8(buf) => append_channels(&mut channels, buf.as_ref()),
            AudioBufferRef::S16(buf) => append_channels(&mut channels, buf.as_ref()),
            AudioBufferRef::S32(buf) => append_channels(&mut channels, buf.as_ref()),
            _ => {
                return Err(WavError::DecodeFailed(
                    "unsupported decoded sample format".to_string(),
                ))
            }
        }
    }

    let decoded = DecodedAudioBuffer {
        sample_rate,
        channels,
    };
    if decoded.channel_count() == 0 || decoded.frames() == 0 || decoded.sample_rate == 0 {
        return Err(WavError::DecodeFailed(
            "no audio frames decoded".to_string(),
        ));
    }
    Ok(decoded)
}

fn append_channels<T>(dst: &mut Vec<Vec<f32>>, buf: &symphonia::core::audio::AudioBuffer<T>)
where
    T: Sample,
    f32: FromSample<T>,
{
    let channel_count = buf.spec().channels.count();
    if dst.len() < channel_count {
        dst.resize_with(channel_count, Vec::new);
    }
    for (ch, samples) in dst.iter_mut().enumerate().take(channel_count) {
        samples.extend(buf.chan(ch).iter().map(|s| f32::from_sample(*s)));
    }
}

/// Encode decoded PCM as a canonical WAV byte stream: 44-byte RIFF/WAVE
/// header followed by interleaved signed 16-bit little-endian samples,
/// frame-major, channel-minor.
pub fn encode_pcm(decoded: &DecodedAudioBuffer) -> Vec<u8> {
    let channel_count = decoded.channel_count();
    let frames = decoded.frames();
    let data_len = (frames * channel_count * 2) as u32;

    let mut out = Vec::with_capacity(HEADER_LEN + data_len as usize);
    write_header(&mut out, decoded.sample_rate, channel_count as u16, data_len);

    for frame in 0..frames {
        for channel in &decoded.channels {
            let sample = quantize_sample(channel[frame]);
            out.extend_from_slice(&sample.to_le_bytes());
        }
    }
    out
}

fn write_header(out: &mut Vec<u8>, sample_rate: u32, channels: u16, data_len: u32) {
    let byte_rate = sample_rate * u32::from(channels) * u32::from(BITS_PER_SAMPLE) / 8;
    let block_align = channels * BITS_PER_SAMPLE / 8;
    let total_len = HEADER_LEN as u32 + data_len;

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(total_len - 8).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
}

/// Map a float sample to the two-sided signed 16-bit range: clamp, apply
/// headroom, then scale by 32768 for negative values and 32767 otherwise.
fn quantize_sample(sample: f32) -> i16 {
    let scaled = sample.clamp(-1.0, 1.0) * HEADROOM;
    if scaled < 0.0 {
        (scaled * 32768.0) as i16
    } else {
        (scaled * 32767.0) as i16
    }
}
