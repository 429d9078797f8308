//! The presentation primitives shared by the sequencer and the observer channel.

use crate::{
    narration::Narrator,
    persona::Roster,
    playback::PlaybackControls,
    reactions::{ReactionBoard, detect_reactions},
    reveal::TextReveal,
    timing::Timings,
    turn::{Transcript, TranscriptEntry, Turn},
};
use std::sync::Arc;
use tracing::{debug, instrument};

/// How a turn is shown while it is narrated.
#[derive(Debug, Clone, Default)]
pub struct Presentation {
    /// Board heading to show while the text is revealed. `None` keeps the
    /// turn off the board (voice only).
    pub heading: Option<String>,
    /// Fire mention/joke reactions before narration starts.
    pub reactions: bool,
}

impl Presentation {
    pub fn on_board(heading: impl Into<String>) -> Self {
        Self {
            heading: Some(heading.into()),
            reactions: false,
        }
    }

    pub fn voice_only() -> Self {
        Self::default()
    }

    pub fn with_reactions(mut self) -> Self {
        self.reactions = true;
        self
    }
}

/// Everything needed to present one turn: playback state, board, narration,
/// reactions and the transcript it ends up in.
pub struct Stage {
    pub controls: PlaybackControls,
    pub transcript: Transcript,
    pub reactions: ReactionBoard,
    pub narrator: Arc<Narrator>,
    pub roster: Arc<Roster>,
    pub timings: Arc<Timings>,
    reveal: TextReveal,
}

impl Stage {
    pub fn new(
        controls: PlaybackControls,
        transcript: Transcript,
        reactions: ReactionBoard,
        narrator: Arc<Narrator>,
        roster: Arc<Roster>,
        timings: Arc<Timings>,
    ) -> Self {
        let reveal = TextReveal::new(controls.clone(), timings.clone());
        Self {
            controls,
            transcript,
            reactions,
            narrator,
            roster,
            timings,
            reveal,
        }
    }

    /// Reveals and narrates a turn, then appends it to the transcript.
    ///
    /// Reveal and narration are joined. A skip stops narration and lets the
    /// reveal snap (or, while audio is still being fetched, drops the fetch
    /// and snaps at once); the class ending abandons the join outright. Either way
    /// the turn is appended with its full text.
    #[instrument(skip_all, fields(speaker = %turn.speaker_id, kind = ?turn.kind))]
    pub async fn present(&self, turn: Turn, presentation: Presentation) -> Arc<TranscriptEntry> {
        let controls = &self.controls;
        controls.begin_turn(&turn.speaker_id);

        if presentation.reactions {
            for (participant, kind) in
                detect_reactions(&turn.text, turn.kind, &turn.speaker_id, &self.roster)
            {
                self.reactions.trigger(participant, kind);
            }
        }
        if let Some(heading) = &presentation.heading {
            controls.set_heading(heading.clone());
            controls.set_board_text("");
        }

        let on_board = presentation.heading.is_some();
        let work = async {
            let prepared = tokio::select! {
                prepared = self.narrator.prepare(&turn.text, &turn.speaker_id) => prepared,
                _ = controls.interrupted() => {
                    debug!("Skipped while pre-fetching narration");
                    if on_board {
                        self.reveal.snap(&turn.text);
                    }
                    return;
                }
            };
            let reveal = async {
                if on_board {
                    self.reveal.run(&turn.text).await;
                }
            };
            let narration = async {
                tokio::select! {
                    outcome = self.narrator.narrate(prepared) => {
                        debug!(backend = ?outcome.backend, timed_out = outcome.timed_out, "Narration finished");
                    }
                    _ = controls.interrupted() => {
                        self.narrator.stop();
                    }
                }
            };
            tokio::join!(reveal, narration);
        };

        tokio::select! {
            _ = work => {}
            _ = controls.ending() => {
                debug!("Class ending mid-turn; snapping to final text");
                if on_board {
                    self.reveal.snap(&turn.text);
                }
                self.narrator.stop();
            }
        }

        let entry = self.transcript.append(turn);
        controls.finish_turn();
        // A skip that landed during this turn has been honored.
        controls.take_skip();
        entry
    }
}
