//! The per-session classroom context.
//!
//! A `Classroom` is created when a session starts and owns everything the
//! session needs: playback state, transcript, reactions, narration, the
//! content provider and the observer channel. The presentation layer drives
//! it through intent methods and watches it through subscriptions; dropping
//! it tears the session down.

use crate::{
    ClassroomEvent,
    content::{self, ContentProvider, LessonRequest},
    evaluation::Evaluation,
    narration::{NarrationBackend, Narrator},
    observer::{ObserverChannel, ObserverError, ObserverTurn},
    persona::{Roster, SpeakerId},
    playback::{ControlError, PlaybackControls, PlaybackSnapshot},
    reactions::{ReactionBoard, ReactionKind},
    sequencer::Sequencer,
    stage::Stage,
    timing::Timings,
    turn::{Transcript, TranscriptEntry},
};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, instrument};

const EVENT_CAPACITY: usize = 256;

pub struct Classroom {
    lesson: LessonRequest,
    stage: Arc<Stage>,
    provider: Arc<dyn ContentProvider>,
    events: broadcast::Sender<ClassroomEvent>,
    observer: ObserverChannel,
    sequencer: Mutex<Option<JoinHandle<()>>>,
}

impl Classroom {
    pub fn new(
        lesson: LessonRequest,
        roster: Roster,
        provider: Arc<dyn ContentProvider>,
        backends: Vec<Arc<dyn NarrationBackend>>,
        timings: Timings,
    ) -> Self {
        let timings = Arc::new(timings);
        let (events, _rx) = broadcast::channel(EVENT_CAPACITY);
        let controls = PlaybackControls::new();
        let stage = Arc::new(Stage::new(
            controls,
            Transcript::new(events.clone()),
            ReactionBoard::new(events.clone(), timings.reaction_lifetime),
            Arc::new(Narrator::new(backends, timings.clone())),
            Arc::new(roster),
            timings,
        ));
        let observer = ObserverChannel::new(stage.clone(), provider.clone(), lesson.clone());
        Self {
            lesson,
            stage,
            provider,
            events,
            observer,
            sequencer: Mutex::new(None),
        }
    }

    pub fn lesson(&self) -> &LessonRequest {
        &self.lesson
    }

    pub fn roster(&self) -> &Roster {
        &self.stage.roster
    }

    /// Spawns the sequencer. Returns `false` if it already ran, or if the
    /// class was ended before it ever started.
    pub fn start(&self) -> bool {
        let mut slot = self.sequencer.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() || self.stage.controls.is_ending() {
            return false;
        }
        let sequencer = Sequencer::new(
            self.stage.clone(),
            self.provider.clone(),
            self.lesson.clone(),
            self.events.clone(),
        );
        *slot = Some(tokio::spawn(sequencer.run()));
        true
    }

    pub fn is_started(&self) -> bool {
        self.sequencer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    // --- Intents ---

    pub fn pause(&self) {
        self.stage.controls.pause();
    }

    pub fn resume(&self) {
        self.stage.controls.resume();
    }

    pub fn set_speed(&self, speed: f64) -> Result<(), ControlError> {
        self.stage.controls.set_speed(speed)
    }

    pub fn skip(&self) {
        self.stage.controls.skip();
    }

    /// Ends the class early. Narration stops before this returns.
    #[instrument(skip(self), fields(topic = %self.lesson.topic))]
    pub fn end_class(&self) -> bool {
        let first = self.stage.controls.end_class();
        self.stage.narrator.stop();
        if first {
            info!("Class ending early");
            // Without a sequencer nobody else will reach the terminal state.
            if !self.is_started() && !self.stage.controls.is_finished() {
                self.stage.controls.mark_finished();
                let _ = self.events.send(ClassroomEvent::ClassFinished);
            }
        }
        first
    }

    pub fn join_observer(&self, name: &str) -> Result<Arc<TranscriptEntry>, ObserverError> {
        self.observer.join(name)
    }

    pub fn send_observer_message(&self, name: &str, text: &str) -> Result<ObserverTurn, ObserverError> {
        self.observer.send(name, text)
    }

    pub fn observer_busy(&self) -> bool {
        self.observer.is_busy()
    }

    // --- Observation ---

    pub fn transcript(&self) -> Vec<Arc<TranscriptEntry>> {
        self.stage.transcript.snapshot()
    }

    pub fn playback(&self) -> PlaybackSnapshot {
        self.stage.controls.snapshot()
    }

    pub fn watch_playback(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.stage.controls.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClassroomEvent> {
        self.events.subscribe()
    }

    pub fn event_stream(&self) -> BroadcastStream<ClassroomEvent> {
        BroadcastStream::new(self.events.subscribe())
    }

    pub fn reaction(&self, participant: &SpeakerId) -> Option<ReactionKind> {
        self.stage.reactions.current(participant)
    }

    pub fn is_finished(&self) -> bool {
        self.stage.controls.is_finished()
    }

    pub async fn wait_finished(&self) {
        self.stage.controls.finished().await;
    }

    /// Scores the class from the full transcript, falling back to default
    /// scores if the provider fails.
    pub async fn evaluate(&self) -> Evaluation {
        let transcript = self.transcript();
        content::evaluation_or_fallback(
            self.provider.as_ref(),
            &self.lesson,
            &self.stage.roster,
            &transcript,
        )
        .await
    }
}

impl Drop for Classroom {
    fn drop(&mut self) {
        self.stage.narrator.stop();
        if let Some(handle) = self
            .sequencer
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}
