use super::ClientLink;
use crate::{
    audio_utils::{encode_base64, sniff_mime},
    voices::{self, ELEVENLABS_MODEL},
    ws::protocol::ServerMessage,
};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use classroom_core::{
    narration::{AudioClip, NarrationBackend},
    persona::SpeakerId,
};
use reqwest::header::ACCEPT;
use std::sync::Arc;
use tracing::debug;

pub const ELEVENLABS_TTS_URL: &str = "https://api.elevenlabs.io/v1/text-to-speech";
const XI_API_KEY_HEADER: &str = "xi-api-key";
// Shorter keys are placeholders from a template `.env`.
const MIN_KEY_LEN: usize = 10;

/// Premium per-speaker voices rendered server side and played by the client.
pub struct ElevenLabsBackend {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    link: Arc<ClientLink>,
}

impl ElevenLabsBackend {
    pub fn new(http: reqwest::Client, api_key: String, link: Arc<ClientLink>) -> Self {
        Self::with_base_url(http, api_key, ELEVENLABS_TTS_URL.to_string(), link)
    }

    pub fn with_base_url(http: reqwest::Client, api_key: String, base_url: String, link: Arc<ClientLink>) -> Self {
        Self {
            http,
            api_key,
            base_url,
            link,
        }
    }
}

#[async_trait]
impl NarrationBackend for ElevenLabsBackend {
    fn name(&self) -> &str {
        "elevenlabs"
    }

    fn is_available(&self) -> bool {
        self.api_key.len() > MIN_KEY_LEN && self.link.is_connected()
    }

    fn supports_prefetch(&self) -> bool {
        true
    }

    async fn prefetch(&self, text: &str, speaker: &SpeakerId) -> Result<AudioClip> {
        let voice = voices::premium(speaker);
        debug!(speaker = %speaker, voice = voice.label, "Requesting speech audio");
        let body = serde_json::json!({
            "text": text,
            "model_id": ELEVENLABS_MODEL,
            "voice_settings": {
                "stability": voice.stability,
                "similarity_boost": voice.similarity_boost,
                "style": voice.style,
                "use_speaker_boost": true
            }
        });

        let response = self
            .http
            .post(format!("{}/{}", self.base_url, voice.voice_id))
            .header(XI_API_KEY_HEADER, &self.api_key)
            .header(ACCEPT, "audio/mpeg")
            .json(&body)
            .send()
            .await
            .context("ElevenLabs request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            bail!("ElevenLabs {status}: {detail}");
        }
        let bytes = response
            .bytes()
            .await
            .context("Failed to read ElevenLabs audio")?;
        if bytes.is_empty() {
            bail!("ElevenLabs returned empty audio");
        }

        Ok(AudioClip {
            speaker_id: speaker.clone(),
            mime: sniff_mime(&bytes).to_string(),
            bytes: bytes.to_vec(),
        })
    }

    async fn play(&self, clip: AudioClip) -> Result<()> {
        let playback_rate = voices::premium(&clip.speaker_id).playback_rate;
        let data = encode_base64(&clip.bytes);
        self.link
            .request(|id| ServerMessage::NarrationAudio {
                id,
                speaker_id: clip.speaker_id,
                mime: clip.mime,
                data,
                playback_rate,
            })
            .await
    }

    async fn speak(&self, text: &str, speaker: &SpeakerId) -> Result<()> {
        let clip = self.prefetch(text, speaker).await?;
        self.play(clip).await
    }

    fn stop(&self) {
        self.link.stop();
    }
}
