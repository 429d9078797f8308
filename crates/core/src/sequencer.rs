//! The playback sequencer: walks the slides, then the conversation, one turn
//! at a time.
//!
//! Each turn goes through the same steps: bail out if the class is ending,
//! wait while paused, honor a pending skip by appending the turn as-is,
//! otherwise present it (reveal + narration joined), then pace before the
//! next one. Pausing only ever takes effect between turns.

use crate::{
    ClassroomEvent,
    content::{self, ContentProvider, LessonRequest},
    playback::Phase,
    stage::{Presentation, Stage},
    timing::Timings,
    turn::{Slide, Turn},
};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, instrument};

pub struct Sequencer {
    stage: Arc<Stage>,
    provider: Arc<dyn ContentProvider>,
    lesson: LessonRequest,
    events: broadcast::Sender<ClassroomEvent>,
}

impl Sequencer {
    pub fn new(
        stage: Arc<Stage>,
        provider: Arc<dyn ContentProvider>,
        lesson: LessonRequest,
        events: broadcast::Sender<ClassroomEvent>,
    ) -> Self {
        Self {
            stage,
            provider,
            lesson,
            events,
        }
    }

    /// Runs the class to completion or early termination.
    #[instrument(skip_all, fields(topic = %self.lesson.topic, subject = %self.lesson.subject))]
    pub async fn run(self) {
        info!("Class started");
        let _ = self.run_phases().await;
        self.finish();
    }

    async fn run_phases(&self) -> ControlFlow<()> {
        let controls = &self.stage.controls;
        let roster = &self.stage.roster;

        controls.set_phase(Phase::RunningSlide);
        let slides = self
            .until_ending(content::slides_or_fallback(
                self.provider.as_ref(),
                &self.lesson,
                roster,
            ))
            .await?;
        info!(count = slides.len(), "Presenting slides");

        let teacher_name = roster.teacher_name();
        for slide in &slides {
            let turn = Turn::from_slide(slide, &teacher_name);
            self.play(turn, Step::Slide(slide)).await?;
        }

        if controls.is_ending() {
            return ControlFlow::Break(());
        }
        controls.set_phase(Phase::RunningConversationTurn);
        let teaching_text = slides
            .iter()
            .map(|s| s.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let history = self.stage.transcript.snapshot();
        let conversation = self
            .until_ending(content::conversation_or_fallback(
                self.provider.as_ref(),
                &self.lesson,
                roster,
                &teaching_text,
                &history,
            ))
            .await?;
        info!(count = conversation.len(), "Presenting conversation");

        for scripted in &conversation {
            self.play(Turn::from_scripted(scripted), Step::Conversation)
                .await?;
        }
        ControlFlow::Continue(())
    }

    /// Awaits a provider call, giving up as soon as the class is ending.
    /// The call itself is not cancelled upstream; its result is discarded.
    async fn until_ending<T>(&self, call: impl Future<Output = T>) -> ControlFlow<(), T> {
        tokio::select! {
            value = call => ControlFlow::Continue(value),
            _ = self.stage.controls.ending() => ControlFlow::Break(()),
        }
    }

    async fn play(&self, turn: Turn, step: Step<'_>) -> ControlFlow<()> {
        let controls = &self.stage.controls;
        if controls.is_ending() {
            return ControlFlow::Break(());
        }
        controls.wait_until_runnable().await;
        if controls.is_ending() {
            return ControlFlow::Break(());
        }
        controls.set_phase(step.phase());

        if controls.take_skip() {
            info!(speaker = %turn.speaker_id, "Turn skipped");
            self.stage.transcript.append(turn);
            controls.set_active_speaker(None);
            return ControlFlow::Continue(());
        }

        let presentation = match step {
            Step::Slide(slide) => {
                controls.set_heading(slide.concept.clone());
                controls.set_board_text("");
                tokio::time::sleep(self.stage.timings.slide_preroll).await;
                Presentation::on_board(slide.concept.clone())
            }
            Step::Conversation => {
                let heading = if turn.speaker_id.is_teacher() {
                    format!("{} responds", turn.speaker_name)
                } else {
                    turn.speaker_name.clone()
                };
                Presentation::on_board(heading).with_reactions()
            }
        };
        self.stage.present(turn, presentation).await;

        controls.set_phase(Phase::Interlude);
        let pacing = Timings::scaled(self.stage.timings.turn_pacing, controls.speed());
        tokio::select! {
            _ = tokio::time::sleep(pacing) => {}
            _ = controls.ending() => {}
        }
        ControlFlow::Continue(())
    }

    fn finish(&self) {
        let controls = &self.stage.controls;
        self.stage.narrator.stop();
        controls.mark_finished();
        info!(
            entries = self.stage.transcript.len(),
            ended_early = controls.is_ending(),
            "Class finished"
        );
        let _ = self.events.send(ClassroomEvent::ClassFinished);
    }
}

#[derive(Clone, Copy)]
enum Step<'a> {
    Slide(&'a Slide),
    Conversation,
}

impl Step<'_> {
    fn phase(&self) -> Phase {
        match self {
            Step::Slide(_) => Phase::RunningSlide,
            Step::Conversation => Phase::RunningConversationTurn,
        }
    }
}
