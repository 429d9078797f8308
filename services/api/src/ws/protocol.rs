//! Defines the WebSocket message protocol between the browser client and the API server.

use crate::{
    models::{Session, TranscriptLine},
    voices::ClientVoice,
};
use classroom_core::{
    persona::{Persona, SpeakerId},
    playback::PlaybackSnapshot,
    reactions::ReactionKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Speech engines the client reported as loaded.
#[derive(Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClientVoices {
    #[serde(default)]
    pub responsive_voice: bool,
    #[serde(default)]
    pub speech_synthesis: bool,
}

/// Messages sent from the client (browser) to the server.
#[derive(Deserialize, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Attaches to a session created over REST and starts its class.
    /// This must be the first message.
    Init {
        session_id: Uuid,
        #[serde(default)]
        voices: ClientVoices,
    },
    Pause,
    Resume,
    SetSpeed { speed: f64 },
    Skip,
    EndClass,
    /// An observer introduces themselves mid-class.
    Join { name: String },
    ObserverMessage { name: String, text: String },
    /// The client finished (or abandoned) playing narration `id`.
    NarrationFinished { id: u64 },
}

/// A client-side speech engine.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SpeechEngine {
    ResponsiveVoice,
    SpeechSynthesis,
}

/// Messages sent from the server to the client (browser).
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Confirms the class is attached and gives the client everything it
    /// needs to draw the room.
    Initialized {
        session: Session,
        roster: Vec<Persona>,
        playback: PlaybackSnapshot,
        transcript: Vec<TranscriptLine>,
    },
    /// The full playback state after any change other than revealed text.
    Playback { state: PlaybackSnapshot },
    /// Characters revealed on the board since the last update; everything
    /// else is unchanged.
    BoardAppend { text: String },
    /// A completed turn, in transcript order.
    Entry { entry: TranscriptLine },
    /// `reaction: null` clears the participant's reaction.
    Reaction {
        participant: SpeakerId,
        reaction: Option<ReactionKind>,
    },
    /// Pre-rendered audio to play; answer with `narration_finished`.
    NarrationAudio {
        id: u64,
        speaker_id: SpeakerId,
        mime: String,
        data: String,
        playback_rate: f32,
    },
    /// Text for a client speech engine to speak; answer with `narration_finished`.
    NarrationSpeak {
        id: u64,
        engine: SpeechEngine,
        speaker_id: SpeakerId,
        chunks: Vec<String>,
        voice: ClientVoice,
    },
    /// Silence everything immediately.
    NarrationStop,
    ClassFinished,
    Error { message: String },
}
