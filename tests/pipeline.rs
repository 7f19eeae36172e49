//! Integration tests wiring the capture and speech loops against mock
//! platform collaborators.

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use uuid::Uuid;

use aac_voice::audio::state::Event;
use aac_voice::audio::{spawn_capture_loop, CaptureNotice, RecordingBackend, WAV_MIME};
use aac_voice::speech::{
    spawn_speech_loop, SpeakError, SpeechSignal, SynthesisEngine, VoiceRef,
};
use aac_voice::wav;

// ============================================================================
// Capture pipeline
// ============================================================================

/// Backend that records a canned set of chunks and hands them over on stop.
struct FixtureBackend {
    mime: String,
    chunks: Vec<Vec<u8>>,
    events: Mutex<Option<mpsc::Sender<Event>>>,
}

impl FixtureBackend {
    fn new(mime: &str, chunks: Vec<Vec<u8>>) -> Arc<Self> {
        Arc::new(Self {
            mime: mime.to_string(),
            chunks,
            events: Mutex::new(None),
        })
    }
}

impl RecordingBackend for FixtureBackend {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        mime_type == self.mime
    }

    fn start(&self, id: Uuid, _format_hint: Option<&str>, events: mpsc::Sender<Event>) {
        let _ = events.try_send(Event::PermissionGranted {
            id,
            mime_type: self.mime.clone(),
        });
        for chunk in &self.chunks {
            let _ = events.try_send(Event::ChunkDelivered {
                id,
                data: chunk.clone(),
            });
        }
        *self.events.lock().unwrap() = Some(events);
    }

    fn stop(&self, id: Uuid) {
        if let Some(events) = self.events.lock().unwrap().take() {
            let _ = events.try_send(Event::RecorderStopped { id });
        }
    }
}

fn fixture_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    wav::encode_pcm(&wav::DecodedAudioBuffer {
        sample_rate,
        channels: vec![samples.to_vec()],
    })
}

async fn wait_for_finished(notices: &mut mpsc::Receiver<CaptureNotice>) -> CaptureNotice {
    loop {
        match notices.recv().await.expect("capture loop ended early") {
            CaptureNotice::PhaseChanged(_) => continue,
            terminal => return terminal,
        }
    }
}

#[tokio::test]
async fn captured_wav_arrives_as_a_valid_transcription_payload() {
    let samples: Vec<f32> = (0..320).map(|i| (i as f32 / 320.0) - 0.5).collect();
    let backend = FixtureBackend::new(WAV_MIME, vec![fixture_wav(&samples, 16000)]);
    let (handle, mut notices) = spawn_capture_loop(backend);

    handle.start().await.unwrap();
    handle.stop().await.unwrap();

    let payload = match wait_for_finished(&mut notices).await {
        CaptureNotice::Finished { payload } => payload,
        other => panic!("expected Finished, got {:?}", other),
    };

    // The payload satisfies the transcription collaborator's contract
    assert_eq!(payload.mime_type(), WAV_MIME);
    let reader = hound::WavReader::new(Cursor::new(payload.bytes().to_vec())).unwrap();
    assert_eq!(reader.spec().sample_rate, 16000);
    assert_eq!(reader.spec().bits_per_sample, 16);
    assert_eq!(reader.len() as usize, samples.len());
}

#[tokio::test]
async fn foreign_encoding_is_normalized_to_canonical_wav() {
    // A decodable recording under a non-WAV tag goes through the converter
    let wav_bytes = fixture_wav(&[0.25, -0.25, 0.5, -0.5], 8000);
    let backend = FixtureBackend::new("audio/webm", vec![wav_bytes]);
    let (handle, mut notices) = spawn_capture_loop(backend);

    handle.start().await.unwrap();
    handle.stop().await.unwrap();

    let payload = match wait_for_finished(&mut notices).await {
        CaptureNotice::Finished { payload } => payload,
        other => panic!("expected Finished, got {:?}", other),
    };

    assert_eq!(payload.mime_type(), WAV_MIME);
    assert_eq!(&payload.bytes()[0..4], b"RIFF");
    assert_eq!(&payload.bytes()[8..12], b"WAVE");
    assert_eq!(payload.bytes().len(), 44 + 4 * 2);
}

#[tokio::test]
async fn capture_phases_are_reported_in_order() {
    use aac_voice::audio::CapturePhase;

    let backend = FixtureBackend::new(WAV_MIME, vec![fixture_wav(&[0.1], 8000)]);
    let (handle, mut notices) = spawn_capture_loop(backend);

    handle.start().await.unwrap();
    handle.stop().await.unwrap();

    let mut phases = Vec::new();
    loop {
        match notices.recv().await.expect("capture loop ended early") {
            CaptureNotice::PhaseChanged(phase) => phases.push(phase),
            CaptureNotice::Finished { .. } => break,
            CaptureNotice::Failed(e) => panic!("unexpected failure: {}", e),
        }
    }
    assert_eq!(
        phases,
        vec![
            CapturePhase::Requesting,
            CapturePhase::Recording,
            CapturePhase::Finalizing,
            CapturePhase::Idle,
        ]
    );
}

// ============================================================================
// Speech loop
// ============================================================================

/// Engine that records dispatches and lets the test complete utterances.
#[derive(Default)]
struct ScriptedEngine {
    spoken: Mutex<Vec<String>>,
    cancels: AtomicUsize,
    in_flight: Mutex<Option<(Uuid, mpsc::Sender<SpeechSignal>)>>,
}

impl ScriptedEngine {
    fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    async fn end_current(&self) {
        let in_flight = self.in_flight.lock().unwrap().take();
        if let Some((id, signals)) = in_flight {
            signals.send(SpeechSignal::Ended { id }).await.unwrap();
        }
    }
}

impl SynthesisEngine for ScriptedEngine {
    fn speak(
        &self,
        id: Uuid,
        text: &str,
        _voice: Option<&VoiceRef>,
        signals: mpsc::Sender<SpeechSignal>,
    ) -> Result<(), SpeakError> {
        self.spoken.lock().unwrap().push(text.to_string());
        *self.in_flight.lock().unwrap() = Some((id, signals));
        Ok(())
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        self.in_flight.lock().unwrap().take();
    }

    fn voices(&self) -> Vec<VoiceRef> {
        vec![VoiceRef::new("Samantha", "en-US")]
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn utterances_play_sequentially_through_the_loop() {
    let engine = Arc::new(ScriptedEngine::default());
    let handle = spawn_speech_loop(engine.clone(), "en-US");

    handle.say("first").await.unwrap();
    handle.say("second").await.unwrap();
    settle().await;

    // Only the head is in flight until the engine reports completion
    assert_eq!(engine.spoken(), vec!["first"]);

    engine.end_current().await;
    settle().await;
    assert_eq!(engine.spoken(), vec!["first", "second"]);

    engine.end_current().await;
    settle().await;
    assert_eq!(engine.spoken(), vec!["first", "second"]);
}

#[tokio::test]
async fn priority_utterance_jumps_the_pending_queue() {
    let engine = Arc::new(ScriptedEngine::default());
    let handle = spawn_speech_loop(engine.clone(), "en-US");

    handle.say("U1").await.unwrap();
    handle.say("U2").await.unwrap();
    settle().await;
    handle.say_priority("U3").await.unwrap();
    settle().await;

    engine.end_current().await;
    settle().await;
    engine.end_current().await;
    settle().await;

    assert_eq!(engine.spoken(), vec!["U1", "U3", "U2"]);
}

#[tokio::test]
async fn stop_cancels_once_and_discards_pending_work() {
    let engine = Arc::new(ScriptedEngine::default());
    let handle = spawn_speech_loop(engine.clone(), "en-US");

    handle.say("U1").await.unwrap();
    handle.say("U2").await.unwrap();
    settle().await;
    handle.stop().await.unwrap();
    settle().await;

    assert_eq!(engine.cancels.load(Ordering::SeqCst), 1);
    assert_eq!(engine.spoken(), vec!["U1"]);

    // No further dispatch until a new enqueue arrives
    settle().await;
    assert_eq!(engine.spoken(), vec!["U1"]);

    handle.say("U3").await.unwrap();
    settle().await;
    assert_eq!(engine.spoken(), vec!["U1", "U3"]);
}

#[tokio::test]
async fn error_signal_from_the_engine_advances_the_queue() {
    let engine = Arc::new(ScriptedEngine::default());
    let handle = spawn_speech_loop(engine.clone(), "en-US");

    handle.say("will fail").await.unwrap();
    handle.say("still plays").await.unwrap();
    settle().await;

    let in_flight = engine.in_flight.lock().unwrap().take();
    let (id, signals) = in_flight.expect("an utterance should be in flight");
    signals
        .send(SpeechSignal::Errored {
            id,
            message: "engine fault".to_string(),
        })
        .await
        .unwrap();
    settle().await;

    assert_eq!(engine.spoken(), vec!["will fail", "still plays"]);
}
