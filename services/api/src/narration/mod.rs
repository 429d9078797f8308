//! Narration backends bound to a single client connection.
//!
//! - `link`: request/acknowledge plumbing over the WebSocket.
//! - `elevenlabs`: server-rendered premium voices, played by the client.
//! - `client_speech`: speech engines that live in the browser.

mod client_speech;
mod elevenlabs;
mod link;

pub use client_speech::ClientSpeechBackend;
pub use elevenlabs::ElevenLabsBackend;
pub use link::ClientLink;

use crate::ws::protocol::SpeechEngine;
use classroom_core::narration::NarrationBackend;
use std::sync::Arc;

/// The backend chain in preference order: premium voices when a key is
/// configured, then the client's ResponsiveVoice, then its built-in speech
/// synthesis.
pub fn backend_chain(
    http: &reqwest::Client,
    elevenlabs_api_key: Option<&str>,
    link: Arc<ClientLink>,
) -> Vec<Arc<dyn NarrationBackend>> {
    let mut chain: Vec<Arc<dyn NarrationBackend>> = Vec::with_capacity(3);
    if let Some(key) = elevenlabs_api_key {
        chain.push(Arc::new(ElevenLabsBackend::new(
            http.clone(),
            key.to_string(),
            link.clone(),
        )));
    }
    chain.push(Arc::new(ClientSpeechBackend::new(
        SpeechEngine::ResponsiveVoice,
        link.clone(),
    )));
    chain.push(Arc::new(ClientSpeechBackend::new(
        SpeechEngine::SpeechSynthesis,
        link,
    )));
    chain
}
