//! Per-speaker voice profiles for each narration engine.
//!
//! Unknown speakers (including the observer) use the teacher's voice.

use classroom_core::persona::SpeakerId;
use serde::Serialize;

pub const ELEVENLABS_MODEL: &str = "eleven_multilingual_v2";

/// A premium voice: the vendor voice id, its synthesis settings and the
/// playback rate the client should apply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PremiumVoice {
    pub voice_id: &'static str,
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub playback_rate: f32,
    pub label: &'static str,
}

/// Voice parameters for a client-side speech engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientVoice {
    /// Named voice, for engines that have a catalogue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<&'static str>,
    pub rate: f32,
    pub pitch: f32,
}

pub fn premium(speaker: &SpeakerId) -> PremiumVoice {
    match speaker.as_str() {
        "ali" => PremiumVoice {
            voice_id: "N2lVS1w4EtoT3dr4eOWO",
            stability: 0.40,
            similarity_boost: 0.80,
            style: 0.75,
            playback_rate: 1.20,
            label: "Callum - Energetic Fast Learner",
        },
        "kirtan" => PremiumVoice {
            voice_id: "IKne3meq5aSn9XLyUdCD",
            stability: 0.90,
            similarity_boost: 0.70,
            style: 0.10,
            playback_rate: 0.78,
            label: "Charlie - Calm Careful ESL",
        },
        "tayyab" => PremiumVoice {
            voice_id: "TX3LPaxmHKxFdv7VOQHJ",
            stability: 0.20,
            similarity_boost: 0.85,
            style: 0.95,
            playback_rate: 1.30,
            label: "Liam - Hyper Class Clown",
        },
        "rana" => PremiumVoice {
            voice_id: "bIHbv24MWmeRgasZH58o",
            stability: 0.92,
            similarity_boost: 0.78,
            style: 0.30,
            playback_rate: 0.88,
            label: "Will - Soft Thoughtful Rana",
        },
        _ => PremiumVoice {
            voice_id: "onwK4e9ZLuTAKqWW03F9",
            stability: 0.55,
            similarity_boost: 0.75,
            style: 0.25,
            playback_rate: 1.15,
            label: "Daniel - British Teacher",
        },
    }
}

pub fn responsive_voice(speaker: &SpeakerId) -> ClientVoice {
    let (voice, rate, pitch) = match speaker.as_str() {
        "ali" => ("US English Male", 1.2, 1.4),
        "kirtan" => ("Australian Male", 0.78, 0.65),
        "tayyab" => ("US English Male", 1.3, 1.7),
        "rana" => ("UK English Male", 0.88, 1.0),
        _ => ("UK English Male", 0.85, 0.7),
    };
    ClientVoice {
        voice: Some(voice),
        rate,
        pitch,
    }
}

pub fn browser_speech(speaker: &SpeakerId) -> ClientVoice {
    let (rate, pitch) = match speaker.as_str() {
        "ali" => (1.20, 1.5),
        "kirtan" => (0.72, 0.55),
        "tayyab" => (1.35, 1.8),
        "rana" => (0.85, 0.95),
        _ => (0.80, 0.6),
    };
    ClientVoice {
        voice: None,
        rate,
        pitch,
    }
}
