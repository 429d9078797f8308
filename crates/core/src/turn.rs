//! Turns, slides, and the append-only transcript.

use crate::{ClassroomEvent, persona::SpeakerId};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum TurnKind {
    Teaching,
    Question,
    Answer,
    Joke,
    Comment,
    Closing,
}

/// One teaching slide as produced by the content provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Slide {
    /// What the teacher says out loud.
    pub content: String,
    /// A 1-3 word title for the concept.
    pub concept: String,
}

/// A Turn-shaped record as produced by the content provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScriptedTurn {
    pub speaker_id: SpeakerId,
    pub speaker_name: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: TurnKind,
}

impl ScriptedTurn {
    pub fn new(speaker_id: &str, speaker_name: &str, text: impl Into<String>, kind: TurnKind) -> Self {
        Self {
            speaker_id: SpeakerId::new(speaker_id),
            speaker_name: speaker_name.to_string(),
            text: text.into(),
            kind,
        }
    }
}

/// One unit of spoken content. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub speaker_id: SpeakerId,
    pub speaker_name: String,
    pub text: String,
    pub kind: TurnKind,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(speaker_id: SpeakerId, speaker_name: impl Into<String>, text: impl Into<String>, kind: TurnKind) -> Self {
        Self {
            speaker_id,
            speaker_name: speaker_name.into(),
            text: text.into(),
            kind,
            created_at: Utc::now(),
        }
    }

    /// A slide is always spoken by the teacher as teaching content.
    pub fn from_slide(slide: &Slide, teacher_name: &str) -> Self {
        Self::new(SpeakerId::teacher(), teacher_name, slide.content.clone(), TurnKind::Teaching)
    }

    pub fn from_scripted(turn: &ScriptedTurn) -> Self {
        Self::new(
            turn.speaker_id.clone(),
            turn.speaker_name.clone(),
            turn.text.clone(),
            turn.kind,
        )
    }

    /// The human observer's literal input.
    pub fn observer(name: &str, text: &str) -> Self {
        Self::new(SpeakerId::observer(), name, text, TurnKind::Question)
    }
}

/// A completed turn as recorded in the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    pub id: Uuid,
    /// Zero-based position in the transcript.
    pub sequence: usize,
    #[serde(flatten)]
    pub turn: Turn,
}

/// Append-only, ordered record of completed turns for a session.
///
/// Both the sequencer and the observer channel write through `append`, which
/// is the only mutation this type offers. Clones share the same log.
#[derive(Debug, Clone)]
pub struct Transcript {
    entries: Arc<Mutex<Vec<Arc<TranscriptEntry>>>>,
    events: broadcast::Sender<ClassroomEvent>,
}

impl Transcript {
    pub fn new(events: broadcast::Sender<ClassroomEvent>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<TranscriptEntry>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn append(&self, turn: Turn) -> Arc<TranscriptEntry> {
        let entry = {
            let mut entries = self.lock();
            let entry = Arc::new(TranscriptEntry {
                id: Uuid::new_v4(),
                sequence: entries.len(),
                turn,
            });
            entries.push(entry.clone());
            entry
        };
        tracing::debug!(
            sequence = entry.sequence,
            speaker = %entry.turn.speaker_id,
            kind = ?entry.turn.kind,
            "Transcript entry appended"
        );
        // No subscribers is fine; the log itself is the record.
        let _ = self.events.send(ClassroomEvent::EntryAppended(entry.clone()));
        entry
    }

    pub fn snapshot(&self) -> Vec<Arc<TranscriptEntry>> {
        self.lock().clone()
    }

    /// The last `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Arc<TranscriptEntry>> {
        let entries = self.lock();
        let start = entries.len().saturating_sub(n);
        entries[start..].to_vec()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Renders entries as `Name: text` lines for prompts.
pub fn render_lines<'a>(entries: impl IntoIterator<Item = &'a TranscriptEntry>) -> String {
    entries
        .into_iter()
        .map(|e| format!("{}: {}", e.turn.speaker_name, e.turn.text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript() -> (Transcript, broadcast::Receiver<ClassroomEvent>) {
        let (tx, rx) = broadcast::channel(16);
        (Transcript::new(tx), rx)
    }

    #[test]
    fn test_append_preserves_order_and_sequence() {
        let (log, _rx) = transcript();
        for text in ["one", "two", "three"] {
            log.append(Turn::new(SpeakerId::teacher(), "Mr. Nova", text, TurnKind::Teaching));
        }
        let texts: Vec<_> = log.snapshot().iter().map(|e| e.turn.text.clone()).collect();
        assert_eq!(texts, ["one", "two", "three"]);
        let seqs: Vec<_> = log.snapshot().iter().map(|e| e.sequence).collect();
        assert_eq!(seqs, [0, 1, 2]);
    }

    #[test]
    fn test_clones_share_the_same_log() {
        let (log, _rx) = transcript();
        let other = log.clone();
        other.append(Turn::observer("Sam", "hi"));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_recent_returns_tail_oldest_first() {
        let (log, _rx) = transcript();
        for i in 0..6 {
            log.append(Turn::observer("Sam", &i.to_string()));
        }
        let tail: Vec<_> = log.recent(4).iter().map(|e| e.turn.text.clone()).collect();
        assert_eq!(tail, ["2", "3", "4", "5"]);
        assert_eq!(log.recent(10).len(), 6);
    }

    #[test]
    fn test_append_broadcasts_entry() {
        let (log, mut rx) = transcript();
        let entry = log.append(Turn::observer("Sam", "what is chlorophyll?"));
        match rx.try_recv().unwrap() {
            ClassroomEvent::EntryAppended(got) => assert_eq!(got.id, entry.id),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_scripted_turn_uses_type_field() {
        let json = r#"{"speakerId":"ali","speakerName":"Ali","text":"Easy!","type":"joke"}"#;
        let turn: ScriptedTurn = serde_json::from_str(json).unwrap();
        assert_eq!(turn.kind, TurnKind::Joke);
        assert_eq!(turn.speaker_id.as_str(), "ali");
    }

    #[test]
    fn test_render_lines_uses_display_names() {
        let (log, _rx) = transcript();
        log.append(Turn::new(SpeakerId::teacher(), "Mr. Nova", "Hello", TurnKind::Teaching));
        log.append(Turn::observer("Sam", "Hi"));
        let snapshot = log.snapshot();
        assert_eq!(
            render_lines(snapshot.iter().map(|e| e.as_ref())),
            "Mr. Nova: Hello\nSam: Hi"
        );
    }
}
