//! The observer interrupt channel.
//!
//! A human participant can speak up at any point of the class. Their message
//! is appended to the transcript right away; a short reply sequence is then
//! generated and played through the same stage as the main loop, running
//! alongside it rather than waiting for it.

use crate::{
    content::{self, ContentProvider, LessonRequest},
    persona::SpeakerId,
    stage::{Presentation, Stage},
    turn::{TranscriptEntry, Turn, TurnKind},
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObserverError {
    #[error("Observer message is empty")]
    EmptyMessage,
    #[error("Observer name is empty")]
    EmptyName,
    #[error("A reply to the previous observer message is still in progress")]
    Busy,
    #[error("The class is over")]
    ClassOver,
}

/// An accepted observer message and the task producing its replies.
#[derive(Debug)]
pub struct ObserverTurn {
    pub message: Arc<TranscriptEntry>,
    pub replies: JoinHandle<Vec<Arc<TranscriptEntry>>>,
}

/// Re-enables observer input when dropped, whatever path the reply took.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct ObserverChannel {
    stage: Arc<Stage>,
    provider: Arc<dyn ContentProvider>,
    lesson: LessonRequest,
    in_flight: Arc<AtomicBool>,
}

impl ObserverChannel {
    pub fn new(stage: Arc<Stage>, provider: Arc<dyn ContentProvider>, lesson: LessonRequest) -> Self {
        Self {
            stage,
            provider,
            lesson,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True while a reply sequence is being generated or played.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), ObserverError> {
        let controls = &self.stage.controls;
        if controls.is_ending() || controls.is_finished() {
            return Err(ObserverError::ClassOver);
        }
        Ok(())
    }

    /// Greets an observer joining mid-class. The welcome is recorded at once
    /// and narrated in the background.
    pub fn join(&self, name: &str) -> Result<Arc<TranscriptEntry>, ObserverError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ObserverError::EmptyName);
        }
        self.ensure_open()?;

        let teacher = self.stage.roster.teacher_name();
        let entry = self.stage.transcript.append(Turn::new(
            SpeakerId::teacher(),
            teacher,
            format!(
                "Oh wonderful! We have a new student joining us today, {name}! Welcome to the class! Feel free to jump in anytime."
            ),
            TurnKind::Comment,
        ));
        info!(observer = name, "Observer joined");

        let narrator = self.stage.narrator.clone();
        let spoken = format!("Oh wonderful! We have a new student joining us, {name}! Welcome!");
        tokio::spawn(async move {
            narrator.speak(&spoken, &SpeakerId::teacher()).await;
        });
        Ok(entry)
    }

    /// Records the observer's message and starts the reply sequence.
    ///
    /// The message is in the transcript by the time this returns. Input is
    /// rejected while a previous reply sequence is still running.
    pub fn send(&self, name: &str, text: &str) -> Result<ObserverTurn, ObserverError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ObserverError::EmptyMessage);
        }
        self.ensure_open()?;
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(ObserverError::Busy);
        }
        let guard = InFlight(self.in_flight.clone());

        let context = self.stage.transcript.recent(self.stage.timings.observer_context);
        let message = self.stage.transcript.append(Turn::observer(name, text));

        let channel = self.clone();
        let name = name.to_string();
        let text = text.to_string();
        let replies = tokio::spawn(async move {
            let _guard = guard;
            channel.reply(&name, &text, &context).await
        });

        Ok(ObserverTurn { message, replies })
    }

    #[instrument(skip(self, context), fields(observer = %name))]
    async fn reply(
        &self,
        name: &str,
        text: &str,
        context: &[Arc<TranscriptEntry>],
    ) -> Vec<Arc<TranscriptEntry>> {
        let controls = &self.stage.controls;
        let roster = &self.stage.roster;

        let turns = tokio::select! {
            turns = content::observer_reply_or_fallback(
                self.provider.as_ref(),
                &self.lesson,
                roster,
                name,
                text,
                context,
            ) => turns,
            _ = controls.ending() => {
                info!("Class ending; dropping observer reply");
                return Vec::new();
            }
        };

        let mut entries = Vec::with_capacity(turns.len());
        for scripted in &turns {
            if controls.is_ending() {
                break;
            }
            if !roster.contains(&scripted.speaker_id) {
                warn!(speaker = %scripted.speaker_id, "Skipping observer reply from unknown speaker");
                continue;
            }
            let presentation = if scripted.speaker_id.is_teacher() {
                Presentation::on_board(format!("Responding to {name}"))
            } else {
                Presentation::voice_only()
            };
            entries.push(self.stage.present(Turn::from_scripted(scripted), presentation).await);

            tokio::select! {
                _ = tokio::time::sleep(self.stage.timings.observer_reply_gap) => {}
                _ = controls.ending() => {}
            }
        }
        info!(replies = entries.len(), "Observer reply finished");
        entries
    }
}
