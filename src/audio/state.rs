//! Capture session state machine.
//!
//! Single-writer pattern: all state transitions go through `reduce()`, which
//! returns the next state and a list of effects for the capture service to
//! execute. Asynchronous completion events carry the session id so that
//! stale deliveries from an abandoned session are dropped.

use uuid::Uuid;

use super::blob::EncodedAudioBlob;

/// Capture failures surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// User declined device access. Terminal for the attempt; the user must
    /// retry manually.
    PermissionDenied(String),
    /// Caller misuse, e.g. start while a session is already active.
    InvalidState(String),
    /// Zero bytes captured; the recording is discarded.
    EmptyRecording,
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::PermissionDenied(reason) => {
                write!(f, "Microphone access denied: {}", reason)
            }
            CaptureError::InvalidState(detail) => write!(f, "Invalid capture state: {}", detail),
            CaptureError::EmptyRecording => write!(f, "Recording contained no audio data"),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Authoritative state of the recording workflow.
#[derive(Debug, Clone)]
pub enum State {
    Idle,
    Requesting {
        session_id: Uuid,
    },
    Recording {
        session_id: Uuid,
        mime_type: String,
        chunks: Vec<Vec<u8>>,
    },
    Finalizing {
        session_id: Uuid,
        mime_type: String,
        chunks: Vec<Vec<u8>>,
    },
}

impl Default for State {
    fn default() -> Self {
        State::Idle
    }
}

/// Events delivered by the caller and the recording backend.
#[derive(Debug, Clone)]
pub enum Event {
    /// Caller requested a new recording.
    StartCapture,
    /// Caller requested the recording to stop and finalize.
    StopCapture,

    // Backend events
    PermissionGranted { id: Uuid, mime_type: String },
    PermissionDenied { id: Uuid, reason: String },
    ChunkDelivered { id: Uuid, data: Vec<u8> },
    RecorderStopped { id: Uuid },
}

/// Effects executed asynchronously by the capture service.
#[derive(Debug, Clone)]
pub enum Effect {
    /// Acquire the microphone and start the backend recorder.
    RequestDevice { id: Uuid },
    /// Stop the backend recorder; the device is released unconditionally
    /// when the recorder handle is dropped.
    StopDevice { id: Uuid },
    /// Hand the assembled blob to the WAV encoder and forward the result.
    FinalizeBlob { id: Uuid, blob: EncodedAudioBlob },
    /// Surface a capture failure to the caller.
    NotifyFailure { error: CaptureError },
    /// Signal a phase change to the UI collaborator.
    NotifyState,
}

/// Reducer: (state, event) -> (next_state, effects).
///
/// Takes the state by value so chunk buffers move instead of being cloned
/// on every delivery. Events with stale session ids are dropped silently.
pub fn reduce(state: State, event: Event) -> (State, Vec<Effect>) {
    use Effect::*;
    use Event::*;
    use State::*;

    match (state, event) {
        // -----------------
        // Idle
        // -----------------
        (Idle, StartCapture) => {
            let id = Uuid::new_v4();
            (
                Requesting { session_id: id },
                vec![RequestDevice { id }, NotifyState],
            )
        }
        // stop() outside Recording has nothing to do
        (Idle, StopCapture) => (Idle, vec![]),

        // start() while a session is active is a caller error
        (state, StartCapture) => (
            state,
            vec![NotifyFailure {
                error: CaptureError::InvalidState(
                    "start requested while a session is already active".to_string(),
                ),
            }],
        ),

        // -----------------
        // Requesting
        // -----------------
        (Requesting { session_id }, PermissionGranted { id, mime_type }) if session_id == id => (
            Recording {
                session_id,
                mime_type,
                chunks: Vec::new(),
            },
            vec![NotifyState],
        ),
        (Requesting { session_id }, PermissionDenied { id, reason }) if session_id == id => (
            Idle,
            vec![
                NotifyFailure {
                    error: CaptureError::PermissionDenied(reason),
                },
                NotifyState,
            ],
        ),

        // -----------------
        // Recording
        // -----------------
        (
            Recording {
                session_id,
                mime_type,
                mut chunks,
            },
            ChunkDelivered { id, data },
        ) if session_id == id => {
            if !data.is_empty() {
                chunks.push(data);
            }
            (
                Recording {
                    session_id,
                    mime_type,
                    chunks,
                },
                vec![],
            )
        }
        (
            Recording {
                session_id,
                mime_type,
                chunks,
            },
            StopCapture,
        ) => (
            Finalizing {
                session_id,
                mime_type,
                chunks,
            },
            vec![StopDevice { id: session_id }, NotifyState],
        ),

        // -----------------
        // Finalizing
        // -----------------
        // In-flight chunks are drained by the stop handler in arrival order.
        (
            Finalizing {
                session_id,
                mime_type,
                mut chunks,
            },
            ChunkDelivered { id, data },
        ) if session_id == id => {
            if !data.is_empty() {
                chunks.push(data);
            }
            (
                Finalizing {
                    session_id,
                    mime_type,
                    chunks,
                },
                vec![],
            )
        }
        (
            Finalizing {
                session_id,
                mime_type,
                chunks,
            },
            RecorderStopped { id },
        ) if session_id == id => {
            let blob = EncodedAudioBlob::assemble(&chunks, &mime_type);
            if blob.is_empty() {
                (
                    Idle,
                    vec![
                        NotifyFailure {
                            error: CaptureError::EmptyRecording,
                        },
                        NotifyState,
                    ],
                )
            } else {
                (
                    Idle,
                    vec![FinalizeBlob {
                        id: session_id,
                        blob,
                    }, NotifyState],
                )
            }
        }

        // -----------------
        // Stale or unhandled events: no transition
        // -----------------
        (state, _) => (state, vec![]),
    }
}
