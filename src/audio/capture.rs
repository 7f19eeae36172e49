//! Capture service: drives the session state machine, executes its effects
//! against the recording backend, and reports progress to the caller.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::blob::EncodedAudioBlob;
use super::format::{negotiate_recording_format, RECORDING_FORMAT_CANDIDATES};
use super::state::{reduce, CaptureError, Effect, Event, State};
use crate::wav;

pub const WAV_MIME: &str = "audio/wav";

/// Recording engine collaborator.
///
/// `start` acquires the microphone asynchronously: the backend emits
/// `PermissionGranted` or `PermissionDenied`, then `ChunkDelivered` events,
/// and a final `RecorderStopped` after `stop`. The device is released
/// unconditionally when the backend's recorder handle is dropped.
pub trait RecordingBackend: Send + Sync + 'static {
    fn is_type_supported(&self, mime_type: &str) -> bool;
    fn start(&self, id: Uuid, format_hint: Option<&str>, events: mpsc::Sender<Event>);
    fn stop(&self, id: Uuid);
}

/// Capture phase reported to the UI collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CapturePhase {
    Idle,
    Requesting,
    Recording,
    Finalizing,
}

fn phase_of(state: &State) -> CapturePhase {
    match state {
        State::Idle => CapturePhase::Idle,
        State::Requesting { .. } => CapturePhase::Requesting,
        State::Recording { .. } => CapturePhase::Recording,
        State::Finalizing { .. } => CapturePhase::Finalizing,
    }
}

/// Progress notices sent to the caller.
#[derive(Debug, Clone)]
pub enum CaptureNotice {
    PhaseChanged(CapturePhase),
    Failed(CaptureError),
    /// The finalized transcription payload: canonical WAV when conversion
    /// succeeded, the original blob otherwise (never silently dropped).
    Finished { payload: EncodedAudioBlob },
}

/// Convert the assembled blob to canonical WAV, falling back to the original
/// bytes when decoding fails.
fn normalize_payload(blob: EncodedAudioBlob) -> EncodedAudioBlob {
    match wav::encode(&blob) {
        Ok(bytes) => EncodedAudioBlob::new(bytes, WAV_MIME),
        Err(e) => {
            log::warn!("WAV conversion failed, forwarding original blob: {}", e);
            blob
        }
    }
}

/// Run the capture loop: drain caller and backend events until the event
/// channel closes. `events_tx` is handed to the backend so its deliveries
/// join the same FIFO as caller requests.
pub async fn run_capture_loop(
    backend: Arc<dyn RecordingBackend>,
    mut events: mpsc::Receiver<Event>,
    events_tx: mpsc::Sender<Event>,
    notices: mpsc::Sender<CaptureNotice>,
) {
    let format_hint = negotiate_recording_format(RECORDING_FORMAT_CANDIDATES, |c| {
        backend.is_type_supported(c)
    })
    .map(str::to_string);
    log::info!("Capture loop started (format hint: {:?})", format_hint);

    let mut state = State::default();
    while let Some(event) = events.recv().await {
        log::debug!("Capture event: {:?}", event);
        let (next, effects) = reduce(std::mem::take(&mut state), event);
        state = next;

        for effect in effects {
            match effect {
                Effect::RequestDevice { id } => {
                    backend.start(id, format_hint.as_deref(), events_tx.clone());
                }
                Effect::StopDevice { id } => backend.stop(id),
                Effect::FinalizeBlob { id, blob } => {
                    log::info!(
                        "Recording {} finalized: {} bytes of {}",
                        id,
                        blob.len(),
                        blob.mime_type()
                    );
                    let payload = normalize_payload(blob);
                    let _ = notices.send(CaptureNotice::Finished { payload }).await;
                }
                Effect::NotifyFailure { error } => {
                    log::warn!("Capture failed: {}", error);
                    let _ = notices.send(CaptureNotice::Failed(error)).await;
                }
                Effect::NotifyState => {
                    let _ = notices
                        .send(CaptureNotice::PhaseChanged(phase_of(&state)))
                        .await;
                }
            }
        }
    }

    log::info!("Capture loop ended");
}

/// Caller-facing handle: sends start/stop requests to the capture loop.
#[derive(Clone)]
pub struct CaptureHandle {
    tx: mpsc::Sender<Event>,
}

impl CaptureHandle {
    /// Request a new recording. Only valid while idle; misuse surfaces as an
    /// `InvalidState` failure notice.
    pub async fn start(&self) -> Result<(), mpsc::error::SendError<Event>> {
        self.tx.send(Event::StartCapture).await
    }

    /// Stop the active recording and finalize it.
    pub async fn stop(&self) -> Result<(), mpsc::error::SendError<Event>> {
        self.tx.send(Event::StopCapture).await
    }
}

/// Spawn the capture loop on the current tokio runtime. Returns the handle
/// and the notice stream for the UI collaborator.
pub fn spawn_capture_loop(
    backend: Arc<dyn RecordingBackend>,
) -> (CaptureHandle, mpsc::Receiver<CaptureNotice>) {
    let (events_tx, events_rx) = mpsc::channel::<Event>(32);
    let (notices_tx, notices_rx) = mpsc::channel::<CaptureNotice>(32);
    tokio::spawn(run_capture_loop(
        backend,
        events_rx,
        events_tx.clone(),
        notices_tx,
    ));
    (CaptureHandle { tx: events_tx }, notices_rx)
}
