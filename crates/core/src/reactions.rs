//! Transient reactions of non-speaking students to mentions and jokes.

use crate::{
    ClassroomEvent,
    persona::{Roster, SpeakerId},
    turn::TurnKind,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Mention,
    Joke,
}

pub const HUMOR_MARKERS: [&str; 4] = ["haha", "joke", "funny", "lol"];

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn mentions(tokens: &[String], name: &str) -> bool {
    let needle = tokenize(name);
    !needle.is_empty() && tokens.windows(needle.len()).any(|w| w == needle.as_slice())
}

/// Works out which students react to a turn, and how.
///
/// A student named as a token reacts with `Mention`; a joke (by kind or by a
/// humor marker in the text) makes every non-speaking student react with
/// `Joke`, which wins over a mention. The speaker never reacts to itself.
pub fn detect_reactions(
    text: &str,
    kind: TurnKind,
    speaker: &SpeakerId,
    roster: &Roster,
) -> Vec<(SpeakerId, ReactionKind)> {
    let tokens = tokenize(text);
    let lower = text.to_lowercase();
    let is_joke = kind == TurnKind::Joke || HUMOR_MARKERS.iter().any(|m| lower.contains(m));

    roster
        .students()
        .filter(|p| &p.id != speaker)
        .filter_map(|p| {
            if is_joke {
                Some((p.id.clone(), ReactionKind::Joke))
            } else if mentions(&tokens, &p.name) || mentions(&tokens, p.id.as_str()) {
                Some((p.id.clone(), ReactionKind::Mention))
            } else {
                None
            }
        })
        .collect()
}

#[derive(Debug, Default)]
struct Pending {
    reactions: HashMap<SpeakerId, (ReactionKind, u64)>,
    generation: u64,
}

/// Per-participant reaction state, each entry expiring on its own timer.
///
/// A new reaction for a participant replaces the pending one; the older
/// timer then finds a newer generation and leaves it alone.
#[derive(Debug, Clone)]
pub struct ReactionBoard {
    pending: Arc<Mutex<Pending>>,
    events: broadcast::Sender<ClassroomEvent>,
    lifetime: Duration,
}

impl ReactionBoard {
    pub fn new(events: broadcast::Sender<ClassroomEvent>, lifetime: Duration) -> Self {
        Self {
            pending: Arc::new(Mutex::new(Pending::default())),
            events,
            lifetime,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Must be called from within a tokio runtime.
    pub fn trigger(&self, participant: SpeakerId, kind: ReactionKind) {
        let generation = {
            let mut pending = self.lock();
            pending.generation += 1;
            let generation = pending.generation;
            pending
                .reactions
                .insert(participant.clone(), (kind, generation));
            generation
        };
        let _ = self.events.send(ClassroomEvent::Reaction {
            participant: participant.clone(),
            reaction: Some(kind),
        });

        let board = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(board.lifetime).await;
            board.expire(participant, generation);
        });
    }

    fn expire(&self, participant: SpeakerId, generation: u64) {
        let expired = {
            let mut pending = self.lock();
            match pending.reactions.get(&participant) {
                Some((_, g)) if *g == generation => {
                    pending.reactions.remove(&participant);
                    true
                }
                _ => false,
            }
        };
        if expired {
            let _ = self.events.send(ClassroomEvent::Reaction {
                participant,
                reaction: None,
            });
        }
    }

    pub fn current(&self, participant: &SpeakerId) -> Option<ReactionKind> {
        self.lock().reactions.get(participant).map(|(kind, _)| *kind)
    }
}
