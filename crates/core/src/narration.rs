//! Narration coordination across an ordered chain of speech backends.
//!
//! Backends are tried in preference order (premium voice service, secondary
//! voice service, local speech). Every failure is swallowed and logged;
//! callers always get a `NarrationOutcome`, at worst one that spoke for zero
//! duration.

use crate::{persona::SpeakerId, timing::Timings};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// A playable audio asset fetched ahead of playback.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub speaker_id: SpeakerId,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// One way of turning text into audible speech.
#[async_trait]
pub trait NarrationBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the backend can be used right now (credentials present,
    /// client engine loaded, ...).
    fn is_available(&self) -> bool;

    fn supports_prefetch(&self) -> bool {
        false
    }

    /// Fetches a clip for later playback.
    async fn prefetch(&self, _text: &str, _speaker: &SpeakerId) -> Result<AudioClip> {
        Err(anyhow!("{} cannot pre-fetch audio", self.name()))
    }

    /// Plays a clip previously returned by `prefetch`, resolving when playback ends.
    async fn play(&self, _clip: AudioClip) -> Result<()> {
        Err(anyhow!("{} cannot play pre-fetched audio", self.name()))
    }

    /// Speaks the text directly, resolving when speech ends.
    async fn speak(&self, text: &str, speaker: &SpeakerId) -> Result<()>;

    /// Halts any audio this backend is producing. Must not block.
    fn stop(&self);
}

/// The result of a narration. Never an error: failures are carried as a reason.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NarrationOutcome {
    /// Backend that produced audio, if any.
    pub backend: Option<String>,
    pub failure: Option<String>,
    pub timed_out: bool,
    /// Another narration (or `stop`) replaced this one.
    pub interrupted: bool,
}

impl NarrationOutcome {
    fn spoken(backend: &str, failures: Vec<String>) -> Self {
        Self {
            backend: Some(backend.to_string()),
            failure: join_failures(failures),
            ..Default::default()
        }
    }

    fn silent(failures: Vec<String>) -> Self {
        Self {
            failure: join_failures(failures),
            ..Default::default()
        }
    }

    pub fn spoke(&self) -> bool {
        self.backend.is_some()
    }
}

fn join_failures(failures: Vec<String>) -> Option<String> {
    (!failures.is_empty()).then(|| failures.join("; "))
}

/// Narration ready to start: either a pre-fetched clip or text to speak directly.
#[derive(Debug, Clone)]
pub struct PreparedNarration {
    text: String,
    speaker: SpeakerId,
    clip: Option<(usize, AudioClip)>,
    prefetch_failure: Option<String>,
}

impl PreparedNarration {
    fn speech(text: &str, speaker: &SpeakerId) -> Self {
        Self {
            text: text.to_string(),
            speaker: speaker.clone(),
            clip: None,
            prefetch_failure: None,
        }
    }

    pub fn has_clip(&self) -> bool {
        self.clip.is_some()
    }
}

/// Coordinates narration so that exactly one is current at a time.
///
/// Starting a narration, or calling `stop`, bumps an epoch; any narration
/// started under an older epoch resolves immediately as interrupted.
pub struct Narrator {
    backends: Vec<Arc<dyn NarrationBackend>>,
    epoch: watch::Sender<u64>,
    timings: Arc<Timings>,
}

impl Narrator {
    pub fn new(backends: Vec<Arc<dyn NarrationBackend>>, timings: Arc<Timings>) -> Self {
        let (epoch, _rx) = watch::channel(0);
        Self {
            backends,
            epoch,
            timings,
        }
    }

    /// A narrator that never makes a sound.
    pub fn silent(timings: Arc<Timings>) -> Self {
        Self::new(Vec::new(), timings)
    }

    /// Pre-fetches a clip on the first available backend that supports it.
    pub async fn prepare(&self, text: &str, speaker: &SpeakerId) -> PreparedNarration {
        let mut prepared = PreparedNarration::speech(text, speaker);
        if text.trim().is_empty() {
            return prepared;
        }
        let Some((index, backend)) = self
            .backends
            .iter()
            .enumerate()
            .find(|(_, b)| b.supports_prefetch() && b.is_available())
        else {
            return prepared;
        };

        let limit = self.timings.prefetch_timeout;
        let fetched = tokio::time::timeout(limit, backend.prefetch(text, speaker))
            .await
            .unwrap_or_else(|_| Err(anyhow!("timed out after {limit:?}")));
        match fetched {
            Ok(clip) => {
                debug!(backend = backend.name(), speaker = %speaker, bytes = clip.bytes.len(), "Audio pre-fetched");
                prepared.clip = Some((index, clip));
            }
            Err(e) => {
                warn!(backend = backend.name(), speaker = %speaker, error = %e, "Audio pre-fetch failed; falling back to direct speech");
                prepared.prefetch_failure = Some(format!("{} prefetch: {e:#}", backend.name()));
            }
        }
        prepared
    }

    /// Plays the prepared narration, replacing any narration still in flight.
    pub async fn narrate(&self, prepared: PreparedNarration) -> NarrationOutcome {
        if prepared.text.trim().is_empty() {
            return NarrationOutcome::default();
        }
        let epoch = self.begin();
        let limit = if prepared.has_clip() {
            self.timings.clip_timeout
        } else {
            self.timings.speech_timeout
        };

        tokio::select! {
            outcome = self.run_chain(prepared) => {
                if let Some(reason) = &outcome.failure {
                    warn!(reason = %reason, spoke = outcome.spoke(), "Narration degraded");
                }
                outcome
            }
            _ = self.superseded(epoch) => {
                debug!("Narration interrupted");
                NarrationOutcome { interrupted: true, ..Default::default() }
            }
            _ = tokio::time::sleep(limit) => {
                warn!(timeout = ?limit, "Narration timed out");
                if *self.epoch.borrow() == epoch {
                    self.stop();
                }
                NarrationOutcome { timed_out: true, ..Default::default() }
            }
        }
    }

    /// Pre-fetch and play in one step.
    pub async fn speak(&self, text: &str, speaker: &SpeakerId) -> NarrationOutcome {
        let prepared = self.prepare(text, speaker).await;
        self.narrate(prepared).await
    }

    /// Halts audio on every backend. Synchronous from the caller's view.
    pub fn stop(&self) {
        self.epoch.send_modify(|e| *e += 1);
        self.stop_backends();
    }

    fn begin(&self) -> u64 {
        self.stop_backends();
        self.epoch.send_modify(|e| *e += 1);
        *self.epoch.borrow()
    }

    fn stop_backends(&self) {
        for backend in &self.backends {
            backend.stop();
        }
    }

    async fn superseded(&self, epoch: u64) {
        let mut rx = self.epoch.subscribe();
        let _ = rx.wait_for(|current| *current != epoch).await;
    }

    async fn run_chain(&self, prepared: PreparedNarration) -> NarrationOutcome {
        let PreparedNarration {
            text,
            speaker,
            clip,
            prefetch_failure,
        } = prepared;
        let mut failures: Vec<String> = prefetch_failure.into_iter().collect();
        let mut start = 0;

        if let Some((index, clip)) = clip {
            let backend = &self.backends[index];
            match backend.play(clip).await {
                Ok(()) => return NarrationOutcome::spoken(backend.name(), failures),
                Err(e) => {
                    warn!(backend = backend.name(), error = %e, "Clip playback failed");
                    failures.push(format!("{} play: {e:#}", backend.name()));
                    start = index + 1;
                }
            }
        }

        for backend in self.backends[start..].iter().filter(|b| b.is_available()) {
            match backend.speak(&text, &speaker).await {
                Ok(()) => return NarrationOutcome::spoken(backend.name(), failures),
                Err(e) => {
                    warn!(backend = backend.name(), error = %e, "Speech backend failed; trying next");
                    failures.push(format!("{} speak: {e:#}", backend.name()));
                }
            }
        }

        if failures.is_empty() {
            failures.push("no narration backend available".to_string());
        }
        NarrationOutcome::silent(failures)
    }
}
