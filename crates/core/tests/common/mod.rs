#![allow(dead_code)]

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use classroom_core::{
    classroom::Classroom,
    content::{ContentProvider, LessonRequest},
    evaluation::Evaluation,
    fallback,
    narration::{AudioClip, NarrationBackend},
    persona::{Roster, SpeakerId},
    playback::PlaybackSnapshot,
    timing::Timings,
    turn::{ScriptedTurn, Slide, TranscriptEntry, TurnKind},
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A content provider returning canned scripts.
#[derive(Default)]
pub struct CannedProvider {
    pub slides: Vec<Slide>,
    pub conversation: Option<Vec<ScriptedTurn>>,
    pub observer_reply: Option<Vec<ScriptedTurn>>,
    /// Artificial latency of the conversation call.
    pub conversation_delay: Duration,
    pub observer_delay: Duration,
}

impl CannedProvider {
    pub fn new(slides: Vec<Slide>, conversation: Vec<ScriptedTurn>) -> Self {
        Self {
            slides,
            conversation: Some(conversation),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ContentProvider for CannedProvider {
    async fn generate_slides(&self, _lesson: &LessonRequest, _roster: &Roster) -> Result<Vec<Slide>> {
        Ok(self.slides.clone())
    }

    async fn generate_conversation(
        &self,
        _lesson: &LessonRequest,
        _roster: &Roster,
        _teaching_text: &str,
        _history: &[Arc<TranscriptEntry>],
    ) -> Result<Vec<ScriptedTurn>> {
        tokio::time::sleep(self.conversation_delay).await;
        self.conversation
            .clone()
            .ok_or_else(|| anyhow!("503 Service Unavailable"))
    }

    async fn generate_observer_reply(
        &self,
        _lesson: &LessonRequest,
        _roster: &Roster,
        _observer_name: &str,
        _observer_text: &str,
        _recent: &[Arc<TranscriptEntry>],
    ) -> Result<Vec<ScriptedTurn>> {
        tokio::time::sleep(self.observer_delay).await;
        self.observer_reply
            .clone()
            .ok_or_else(|| anyhow!("connection reset"))
    }

    async fn generate_evaluation(
        &self,
        _lesson: &LessonRequest,
        _roster: &Roster,
        _transcript: &[Arc<TranscriptEntry>],
    ) -> Result<Evaluation> {
        Ok(fallback::evaluation())
    }

    async fn detect_subject(&self, _input: &str) -> Result<String> {
        Ok("Biology".to_string())
    }
}

/// A speech backend that records what it was asked to say and takes
/// `per_char` per character to say it.
pub struct RecordingVoice {
    pub per_char: Duration,
    pub spoken: Mutex<Vec<String>>,
    pub stops: Mutex<usize>,
}

impl RecordingVoice {
    pub fn new(per_char: Duration) -> Arc<Self> {
        Arc::new(Self {
            per_char,
            spoken: Mutex::new(Vec::new()),
            stops: Mutex::new(0),
        })
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn stops(&self) -> usize {
        *self.stops.lock().unwrap()
    }
}

#[async_trait]
impl NarrationBackend for RecordingVoice {
    fn name(&self) -> &str {
        "recording"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn speak(&self, text: &str, _speaker: &SpeakerId) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        tokio::time::sleep(self.per_char * text.chars().count() as u32).await;
        Ok(())
    }

    fn stop(&self) {
        *self.stops.lock().unwrap() += 1;
    }
}

/// A premium voice whose audio download never finishes; direct speech works.
pub struct StalledVoice;

#[async_trait]
impl NarrationBackend for StalledVoice {
    fn name(&self) -> &str {
        "stalled"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn supports_prefetch(&self) -> bool {
        true
    }

    async fn prefetch(&self, _text: &str, _speaker: &SpeakerId) -> Result<AudioClip> {
        std::future::pending::<Result<AudioClip>>().await
    }

    async fn speak(&self, _text: &str, _speaker: &SpeakerId) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(())
    }

    fn stop(&self) {}
}

pub fn slide(concept: &str, content: &str) -> Slide {
    Slide {
        concept: concept.to_string(),
        content: content.to_string(),
    }
}

pub fn said(speaker: &str, name: &str, text: &str, kind: TurnKind) -> ScriptedTurn {
    ScriptedTurn::new(speaker, name, text, kind)
}

pub fn lesson() -> LessonRequest {
    LessonRequest::new("photosynthesis", "Biology")
}

pub fn classroom(provider: impl ContentProvider + 'static) -> Classroom {
    Classroom::new(
        lesson(),
        Roster::default(),
        Arc::new(provider),
        Vec::new(),
        Timings::default(),
    )
}

pub fn classroom_with_voice(
    provider: impl ContentProvider + 'static,
    voice: Arc<RecordingVoice>,
) -> Classroom {
    Classroom::new(
        lesson(),
        Roster::default(),
        Arc::new(provider),
        vec![voice as Arc<dyn NarrationBackend>],
        Timings::default(),
    )
}

pub fn classroom_with_backends(
    provider: impl ContentProvider + 'static,
    backends: Vec<Arc<dyn NarrationBackend>>,
) -> Classroom {
    Classroom::new(
        lesson(),
        Roster::default(),
        Arc::new(provider),
        backends,
        Timings::default(),
    )
}

pub fn texts(entries: &[Arc<TranscriptEntry>]) -> Vec<String> {
    entries.iter().map(|e| e.turn.text.clone()).collect()
}

/// Waits until the playback state satisfies `predicate`.
pub async fn wait_for(classroom: &Classroom, predicate: impl FnMut(&PlaybackSnapshot) -> bool) {
    let mut rx = classroom.watch_playback();
    rx.wait_for(predicate).await.unwrap();
}
