pub mod analytics;
pub mod classroom;
pub mod content;
pub mod evaluation;
pub mod fallback;
pub mod narration;
pub mod observer;
pub mod persona;
pub mod playback;
pub mod reactions;
pub mod reveal;
pub mod sequencer;
pub mod stage;
pub mod subject;
pub mod timing;
pub mod turn;

use std::sync::Arc;

/// Discrete happenings a classroom publishes to its presentation surface.
///
/// Continuous state (speaker, board, pause/speed) is observed through the
/// playback watch channel instead; this enum only carries what a watcher
/// would otherwise miss between two snapshots.
#[derive(Debug, Clone)]
pub enum ClassroomEvent {
    /// A turn completed and was appended to the transcript.
    EntryAppended(Arc<turn::TranscriptEntry>),
    /// A participant's transient reaction changed; `None` means it expired.
    Reaction {
        participant: persona::SpeakerId,
        reaction: Option<reactions::ReactionKind>,
    },
    /// The sequencer reached its terminal state.
    ClassFinished,
}
