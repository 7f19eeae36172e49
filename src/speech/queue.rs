//! Sequential speech playback scheduling.
//!
//! A FIFO queue of pending utterances with at-most-one concurrent playback.
//! The scheduler reacts to completion and error signals from the synthesis
//! engine; a failing utterance is skipped and never stalls the rest of the
//! queue. `stop()` cancels the platform once and clears everything.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::mpsc;
use uuid::Uuid;

use super::engine::{SpeechSignal, SynthesisEngine};
use super::voice::{select_voice, VoiceRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtteranceState {
    Pending,
    Speaking,
    Done,
    Errored,
}

/// A unit of text scheduled for synthesis, owned by the queue until it
/// completes or errors.
#[derive(Debug, Clone)]
pub struct Utterance {
    pub id: Uuid,
    pub text: String,
    pub voice: Option<VoiceRef>,
    pub state: UtteranceState,
}

impl Utterance {
    pub fn new(text: impl Into<String>, voice: Option<VoiceRef>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            voice,
            state: UtteranceState::Pending,
        }
    }
}

/// Commands accepted by the speech loop.
#[derive(Debug, Clone)]
pub enum SpeechCommand {
    Enqueue {
        text: String,
        voice: Option<VoiceRef>,
        at_front: bool,
    },
    Stop,
    /// Advisory: the platform's voice list changed.
    VoicesChanged,
}

/// The queue state machine. Mutation happens on one logical thread; the
/// async loop in [`run_speech_loop`] is the production driver.
pub struct SpeechScheduler {
    engine: Arc<dyn SynthesisEngine>,
    signals: mpsc::Sender<SpeechSignal>,
    locale: String,
    pending: VecDeque<Utterance>,
    current: Option<Utterance>,
}

impl SpeechScheduler {
    pub fn new(
        engine: Arc<dyn SynthesisEngine>,
        signals: mpsc::Sender<SpeechSignal>,
        locale: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            signals,
            locale: locale.into(),
            pending: VecDeque::new(),
            current: None,
        }
    }

    /// Append an utterance, or insert it at the head for priority use-cases.
    /// A front-inserted utterance jumps ahead of everything queued but never
    /// ahead of the utterance already speaking. Returns the utterance id.
    pub fn enqueue(&mut self, text: &str, voice: Option<VoiceRef>, at_front: bool) -> Uuid {
        let utterance = Utterance::new(text, voice);
        let id = utterance.id;
        if at_front {
            self.pending.push_front(utterance);
        } else {
            self.pending.push_back(utterance);
        }
        self.drive();
        id
    }

    /// Cancel the platform's current utterance and clear the entire queue.
    pub fn stop(&mut self) {
        self.engine.cancel();
        self.pending.clear();
        self.current = None;
    }

    /// Completion or error signal for a dispatched utterance. Signals whose
    /// id does not match the current utterance are stale and dropped.
    pub fn handle_signal(&mut self, signal: SpeechSignal) {
        let current_id = match &self.current {
            Some(u) => u.id,
            None => {
                log::debug!("Speech signal with no utterance in flight: {:?}", signal);
                return;
            }
        };
        match signal {
            SpeechSignal::Ended { id } if id == current_id => {
                // Finished utterances are discarded, not retained
                self.current = None;
            }
            SpeechSignal::Errored { id, message } if id == current_id => {
                log::warn!("Speech synthesis error for utterance {}: {}", id, message);
                self.current = None;
            }
            stale => {
                log::debug!("Dropping stale speech signal: {:?}", stale);
                return;
            }
        }
        self.drive();
    }

    /// Voice availability is advisory; a changed list never blocks playback.
    pub fn voices_changed(&mut self) {
        self.drive();
    }

    pub fn is_speaking(&self) -> bool {
        self.current.is_some()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn current_id(&self) -> Option<Uuid> {
        self.current.as_ref().map(|u| u.id)
    }

    /// Dispatch the head utterance whenever the queue is non-empty and
    /// nothing is speaking. A synchronous dispatch failure is treated like
    /// an error signal: skip the utterance and keep going.
    fn drive(&mut self) {
        while self.current.is_none() {
            let Some(mut utterance) = self.pending.pop_front() else {
                break;
            };
            if utterance.voice.is_none() {
                utterance.voice = select_voice(self.engine.as_ref(), &self.locale);
            }
            utterance.state = UtteranceState::Speaking;

            match self.engine.speak(
                utterance.id,
                &utterance.text,
                utterance.voice.as_ref(),
                self.signals.clone(),
            ) {
                Ok(()) => {
                    self.current = Some(utterance);
                }
                Err(e) => {
                    // Treated like an error signal: skip and keep going
                    log::warn!(
                        "Speech dispatch failed for utterance {}: {}",
                        utterance.id,
                        e
                    );
                }
            }
        }
    }
}

/// Run the speech loop: drain caller commands and engine signals on a single
/// task until the command channel closes.
pub async fn run_speech_loop(
    engine: Arc<dyn SynthesisEngine>,
    locale: String,
    mut commands: mpsc::Receiver<SpeechCommand>,
) {
    let (signal_tx, mut signal_rx) = mpsc::channel::<SpeechSignal>(32);
    let mut scheduler = SpeechScheduler::new(engine, signal_tx, locale);
    log::info!("Speech loop started");

    loop {
        tokio::select! {
            command = commands.recv() => {
                let Some(command) = command else { break };
                log::debug!("Speech command: {:?}", command);
                match command {
                    SpeechCommand::Enqueue { text, voice, at_front } => {
                        scheduler.enqueue(&text, voice, at_front);
                    }
                    SpeechCommand::Stop => scheduler.stop(),
                    SpeechCommand::VoicesChanged => scheduler.voices_changed(),
                }
            }
            signal = signal_rx.recv() => {
                // The scheduler holds a sender clone, so this arm stays live
                if let Some(signal) = signal {
                    scheduler.handle_signal(signal);
                }
            }
        }
    }

    log::info!("Speech loop ended");
}

/// Caller-facing handle: sends commands to the speech loop.
#[derive(Clone)]
pub struct SpeechHandle {
    tx: mpsc::Sender<SpeechCommand>,
}

impl SpeechHandle {
    /// Queue text for playback at the tail of the queue.
    pub async fn say(&self, text: &str) -> Result<(), mpsc::error::SendError<SpeechCommand>> {
        self.tx
            .send(SpeechCommand::Enqueue {
                text: text.to_string(),
                voice: None,
                at_front: false,
            })
            .await
    }

    /// Queue text ahead of all pending utterances.
    pub async fn say_priority(
        &self,
        text: &str,
    ) -> Result<(), mpsc::error::SendError<SpeechCommand>> {
        self.tx
            .send(SpeechCommand::Enqueue {
                text: text.to_string(),
                voice: None,
                at_front: true,
            })
            .await
    }

    /// Cancel playback and discard every queued utterance.
    pub async fn stop(&self) -> Result<(), mpsc::error::SendError<SpeechCommand>> {
        self.tx.send(SpeechCommand::Stop).await
    }

    pub async fn voices_changed(&self) -> Result<(), mpsc::error::SendError<SpeechCommand>> {
        self.tx.send(SpeechCommand::VoicesChanged).await
    }
}

/// Spawn the speech loop on the current tokio runtime.
pub fn spawn_speech_loop(engine: Arc<dyn SynthesisEngine>, locale: &str) -> SpeechHandle {
    let (tx, rx) = mpsc::channel::<SpeechCommand>(32);
    tokio::spawn(run_speech_loop(engine, locale.to_string(), rx));
    SpeechHandle { tx }
}
