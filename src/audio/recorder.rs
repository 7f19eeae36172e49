//! Microphone recording backend using CPAL for capture and hound for WAV
//! writing.
//!
//! Each session runs on a dedicated audio thread that owns the CPAL stream
//! (streams are not `Send`). The thread acquires the device, writes 16-bit
//! samples to a scratch WAV, and on stop finalizes the file, delivers its
//! bytes as one chunk, and removes it. Dropping the stream releases the
//! device on every exit path.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc, Mutex};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use hound::{WavSpec, WavWriter};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::capture::{RecordingBackend, WAV_MIME};
use super::paths::{cleanup_stale_recordings, generate_wav_path};
use super::state::Event;

type SharedWriter = Arc<Mutex<Option<WavWriter<std::io::BufWriter<std::fs::File>>>>>;

struct ActiveRecording {
    stop_tx: std_mpsc::Sender<()>,
}

/// Recording backend for the default CPAL input device. Captured audio is
/// already WAV, so the negotiated encoding is `audio/wav` and downstream
/// conversion is a passthrough.
pub struct CpalRecorder {
    active: Arc<Mutex<HashMap<Uuid, ActiveRecording>>>,
}

impl CpalRecorder {
    pub fn new() -> Self {
        match cleanup_stale_recordings() {
            Ok(removed) if removed > 0 => {
                log::info!("Removed {} stale scratch recordings", removed)
            }
            Ok(_) => {}
            Err(e) => log::warn!("Scratch cleanup failed: {}", e),
        }
        Self {
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for CpalRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend for CpalRecorder {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        let tag = mime_type.split(';').next().unwrap_or(mime_type).trim();
        tag.eq_ignore_ascii_case("audio/wav") || tag.eq_ignore_ascii_case("audio/x-wav")
    }

    fn start(&self, id: Uuid, format_hint: Option<&str>, events: mpsc::Sender<Event>) {
        log::debug!("Recorder start for session {} (hint: {:?})", id, format_hint);
        let (stop_tx, stop_rx) = std_mpsc::channel();
        self.active
            .lock()
            .unwrap()
            .insert(id, ActiveRecording { stop_tx });

        let active = self.active.clone();
        std::thread::spawn(move || record_thread(id, stop_rx, events, active));
    }

    fn stop(&self, id: Uuid) {
        match self.active.lock().unwrap().remove(&id) {
            Some(recording) => {
                // The audio thread wakes up, drops the stream, and finalizes
                let _ = recording.stop_tx.send(());
            }
            None => log::warn!("Recorder stop for unknown session {}", id),
        }
    }
}

struct LiveStream {
    stream: Stream,
    writer: SharedWriter,
    is_recording: Arc<AtomicBool>,
    wav_path: PathBuf,
}

fn record_thread(
    id: Uuid,
    stop_rx: std_mpsc::Receiver<()>,
    events: mpsc::Sender<Event>,
    active: Arc<Mutex<HashMap<Uuid, ActiveRecording>>>,
) {
    let live = match acquire_and_play(id) {
        Ok(live) => live,
        Err(reason) => {
            log::error!("Failed to start recording {}: {}", id, reason);
            active.lock().unwrap().remove(&id);
            let _ = events.blocking_send(Event::PermissionDenied { id, reason });
            return;
        }
    };

    let _ = events.blocking_send(Event::PermissionGranted {
        id,
        mime_type: WAV_MIME.to_string(),
    });

    // Park until stop() fires or the recorder itself is dropped
    let _ = stop_rx.recv();
    live.is_recording.store(false, Ordering::SeqCst);
    drop(live.stream);
    active.lock().unwrap().remove(&id);

    match finalize_wav(&live.writer, &live.wav_path) {
        Ok(bytes) => {
            log::info!("Recording {} stopped ({} bytes)", id, bytes.len());
            if !bytes.is_empty() {
                let _ = events.blocking_send(Event::ChunkDelivered { id, data: bytes });
            }
        }
        Err(e) => {
            // Surfaces downstream as an empty recording
            log::error!("Failed to finalize recording {}: {}", id, e);
        }
    }
    let _ = events.blocking_send(Event::RecorderStopped { id });
}

fn acquire_and_play(id: Uuid) -> Result<LiveStream, String> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| "no audio input device found".to_string())?;
    log::info!("Using audio input device: {:?}", device.name());

    let supported_config = device
        .default_input_config()
        .map_err(|e| format!("no supported audio configuration: {}", e))?;
    log::info!(
        "Audio config: {} Hz, {} channels, {:?}",
        supported_config.sample_rate().0,
        supported_config.channels(),
        supported_config.sample_format()
    );

    let sample_format = supported_config.sample_format();
    let config: StreamConfig = supported_config.into();

    let wav_path = generate_wav_path(id).map_err(|e| format!("scratch file: {}", e))?;
    let spec = WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate.0,
        bits_per_sample: 16, // Always write as 16-bit
        sample_format: hound::SampleFormat::Int,
    };
    let writer: SharedWriter = Arc::new(Mutex::new(Some(
        WavWriter::create(&wav_path, spec).map_err(|e| format!("create WAV: {}", e))?,
    )));

    let is_recording = Arc::new(AtomicBool::new(true));
    let stream = build_stream(
        &device,
        &config,
        sample_format,
        writer.clone(),
        is_recording.clone(),
    )?;
    stream
        .play()
        .map_err(|e| format!("failed to start stream: {}", e))?;

    Ok(LiveStream {
        stream,
        writer,
        is_recording,
        wav_path,
    })
}

fn build_stream(
    device: &Device,
    config: &StreamConfig,
    sample_format: SampleFormat,
    writer: SharedWriter,
    is_recording: Arc<AtomicBool>,
) -> Result<Stream, String> {
    let err_fn = |err| log::error!("Audio stream error: {}", err);

    match sample_format {
        SampleFormat::I16 => build_stream_typed::<i16>(device, config, writer, is_recording, err_fn),
        SampleFormat::U16 => build_stream_typed::<u16>(device, config, writer, is_recording, err_fn),
        SampleFormat::F32 => build_stream_typed::<f32>(device, config, writer, is_recording, err_fn),
        other => Err(format!("unsupported sample format: {:?}", other)),
    }
}

fn build_stream_typed<T>(
    device: &Device,
    config: &StreamConfig,
    writer: SharedWriter,
    is_recording: Arc<AtomicBool>,
    err_fn: impl FnMut(cpal::StreamError) + Send + 'static,
) -> Result<Stream, String>
where
    T: cpal::Sample<Float = f32> + cpal::SizedSample + Send + 'static,
{
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                if !is_recording.load(Ordering::SeqCst) {
                    return;
                }
                let mut guard = writer.lock().unwrap();
                if let Some(ref mut w) = *guard {
                    for &sample in data {
                        if w.write_sample(sample_to_i16(sample)).is_err() {
                            log::error!("Failed to write sample");
                            break;
                        }
                    }
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| e.to_string())
}

/// Finalize the scratch WAV, read it back, and remove it.
fn finalize_wav(writer: &SharedWriter, wav_path: &PathBuf) -> Result<Vec<u8>, String> {
    if let Some(w) = writer.lock().unwrap().take() {
        w.finalize().map_err(|e| e.to_string())?;
    }
    let bytes = std::fs::read(wav_path).map_err(|e| e.to_string())?;
    if let Err(e) = std::fs::remove_file(wav_path) {
        log::warn!("Failed to remove scratch WAV {:?}: {}", wav_path, e);
    }
    Ok(bytes)
}

/// Convert any sample type to i16 for WAV writing.
fn sample_to_i16<T: cpal::Sample<Float = f32>>(sample: T) -> i16 {
    let f32_sample: f32 = sample.to_float_sample();
    let clamped = f32_sample.clamp(-1.0, 1.0);
    (clamped * i16::MAX as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_types_are_wav_only() {
        let recorder = CpalRecorder::new();
        assert!(recorder.is_type_supported("audio/wav"));
        assert!(recorder.is_type_supported("audio/x-wav"));
        assert!(recorder.is_type_supported("audio/wav;codecs=1"));
        assert!(!recorder.is_type_supported("audio/webm"));
        assert!(!recorder.is_type_supported("audio/ogg;codecs=opus"));
    }

    #[test]
    fn test_sample_to_i16() {
        assert_eq!(sample_to_i16(0.0f32), 0);
        assert_eq!(sample_to_i16(1.0f32), i16::MAX);
        assert_eq!(sample_to_i16(-1.0f32), -i16::MAX);

        // Out-of-range input is clamped
        assert_eq!(sample_to_i16(2.0f32), i16::MAX);
        assert_eq!(sample_to_i16(-2.0f32), -i16::MAX);
    }
}
