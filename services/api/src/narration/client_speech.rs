use super::ClientLink;
use crate::{
    audio_utils::sentence_chunks,
    voices,
    ws::protocol::{ServerMessage, SpeechEngine},
};
use anyhow::Result;
use async_trait::async_trait;
use classroom_core::{narration::NarrationBackend, persona::SpeakerId};
use std::sync::Arc;

/// A speech engine running in the browser.
pub struct ClientSpeechBackend {
    engine: SpeechEngine,
    link: Arc<ClientLink>,
}

impl ClientSpeechBackend {
    pub fn new(engine: SpeechEngine, link: Arc<ClientLink>) -> Self {
        Self { engine, link }
    }
}

#[async_trait]
impl NarrationBackend for ClientSpeechBackend {
    fn name(&self) -> &str {
        match self.engine {
            SpeechEngine::ResponsiveVoice => "responsive_voice",
            SpeechEngine::SpeechSynthesis => "speech_synthesis",
        }
    }

    fn is_available(&self) -> bool {
        let voices = self.link.voices();
        let loaded = match self.engine {
            SpeechEngine::ResponsiveVoice => voices.responsive_voice,
            SpeechEngine::SpeechSynthesis => voices.speech_synthesis,
        };
        loaded && self.link.is_connected()
    }

    async fn speak(&self, text: &str, speaker: &SpeakerId) -> Result<()> {
        let (chunks, voice) = match self.engine {
            SpeechEngine::ResponsiveVoice => (vec![text.trim().to_string()], voices::responsive_voice(speaker)),
            SpeechEngine::SpeechSynthesis => (sentence_chunks(text), voices::browser_speech(speaker)),
        };
        if chunks.iter().all(|c| c.is_empty()) {
            return Ok(());
        }
        self.link
            .request(|id| ServerMessage::NarrationSpeak {
                id,
                engine: self.engine,
                speaker_id: speaker.clone(),
                chunks,
                voice,
            })
            .await
    }

    fn stop(&self) {
        self.link.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::ClientVoices;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_availability_follows_the_reported_engines() {
        let (tx, rx) = mpsc::unbounded_channel();
        let voices = ClientVoices {
            responsive_voice: false,
            speech_synthesis: true,
        };
        let link = Arc::new(ClientLink::new(tx, voices));
        let rv = ClientSpeechBackend::new(SpeechEngine::ResponsiveVoice, link.clone());
        let browser = ClientSpeechBackend::new(SpeechEngine::SpeechSynthesis, link);

        assert!(!rv.is_available());
        assert!(browser.is_available());
        drop(rx);
        assert!(!browser.is_available());
    }

    #[tokio::test]
    async fn test_browser_speech_is_sent_sentence_by_sentence() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let link = Arc::new(ClientLink::new(tx, ClientVoices::default()));
        let backend = Arc::new(ClientSpeechBackend::new(SpeechEngine::SpeechSynthesis, link.clone()));

        let speaker = backend.clone();
        let handle = tokio::spawn(async move {
            speaker.speak("Plants eat light. Isn't that neat?", &SpeakerId::new("ali")).await
        });

        let Some(ServerMessage::NarrationSpeak { id, engine, speaker_id, chunks, .. }) = rx.recv().await else {
            panic!("expected a narration_speak message");
        };
        assert_eq!(engine, SpeechEngine::SpeechSynthesis);
        assert_eq!(speaker_id, SpeakerId::new("ali"));
        assert_eq!(chunks, vec!["Plants eat light.", "Isn't that neat?"]);

        link.acknowledge(id);
        assert!(handle.await.unwrap().is_ok());
    }
}
