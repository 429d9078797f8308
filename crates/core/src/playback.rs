//! Playback state shared between the sequencer and the presentation layer.
//!
//! The state lives in a single `watch` channel: the sequencer and the intent
//! methods write through `send_modify`, while observers subscribe and re-render
//! on every change. Waiting on the channel replaces polling a flag.

use crate::persona::SpeakerId;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AwaitingStart,
    RunningSlide,
    RunningConversationTurn,
    Interlude,
    Finished,
}

/// The shared display surface that the text reveal writes to.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    pub heading: String,
    pub text: String,
    pub is_typing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub is_running: bool,
    pub speed: f64,
    pub active_speaker: Option<SpeakerId>,
    pub is_narrating: bool,
    pub is_class_finished: bool,
    pub skip_requested: bool,
    pub is_ending: bool,
    pub phase: Phase,
    pub board: Board,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self {
            is_running: true,
            speed: 1.0,
            active_speaker: None,
            is_narrating: false,
            is_class_finished: false,
            skip_requested: false,
            is_ending: false,
            phase: Phase::AwaitingStart,
            board: Board::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ControlError {
    #[error("Playback speed must be a positive number, got {0}")]
    InvalidSpeed(f64),
}

/// Handle to the authoritative playback state. Clones share the same state.
#[derive(Debug, Clone)]
pub struct PlaybackControls {
    state: Arc<watch::Sender<PlaybackSnapshot>>,
}

impl Default for PlaybackControls {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackControls {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(PlaybackSnapshot::default());
        Self { state: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.state.subscribe()
    }

    // --- Intents ---

    pub fn pause(&self) {
        self.state.send_if_modified(|s| {
            if s.is_ending || !s.is_running {
                return false;
            }
            s.is_running = false;
            true
        });
    }

    pub fn resume(&self) {
        self.state.send_if_modified(|s| {
            if s.is_running {
                return false;
            }
            s.is_running = true;
            true
        });
    }

    /// Accepts any positive, finite multiplier; takes effect on the next tick.
    pub fn set_speed(&self, speed: f64) -> Result<(), ControlError> {
        if !(speed.is_finite() && speed > 0.0) {
            return Err(ControlError::InvalidSpeed(speed));
        }
        self.state.send_modify(|s| s.speed = speed);
        Ok(())
    }

    pub fn skip(&self) {
        self.state.send_if_modified(|s| {
            if s.is_class_finished || s.skip_requested {
                return false;
            }
            s.skip_requested = true;
            true
        });
    }

    /// Sets the terminal early-exit flag. Returns `false` if it was already set.
    ///
    /// Also forces `is_running` so nothing stays parked on a pause.
    pub fn end_class(&self) -> bool {
        self.state.send_if_modified(|s| {
            if s.is_ending {
                return false;
            }
            s.is_ending = true;
            s.is_running = true;
            true
        })
    }

    // --- Reads ---

    pub fn speed(&self) -> f64 {
        self.state.borrow().speed
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().is_running
    }

    pub fn is_ending(&self) -> bool {
        self.state.borrow().is_ending
    }

    pub fn is_finished(&self) -> bool {
        self.state.borrow().is_class_finished
    }

    pub fn skip_requested(&self) -> bool {
        self.state.borrow().skip_requested
    }

    /// True when the current reveal should snap to its final text.
    pub fn should_snap(&self) -> bool {
        let s = self.state.borrow();
        s.skip_requested || s.is_ending
    }

    // --- Sequencer-side writes ---

    /// Clears a pending skip, reporting whether one was pending.
    pub fn take_skip(&self) -> bool {
        let mut taken = false;
        self.state.send_if_modified(|s| {
            taken = s.skip_requested;
            s.skip_requested = false;
            taken
        });
        taken
    }

    pub fn set_phase(&self, phase: Phase) {
        self.state.send_if_modified(|s| {
            if s.phase == phase || s.phase == Phase::Finished {
                return false;
            }
            s.phase = phase;
            true
        });
    }

    pub fn begin_turn(&self, speaker: &SpeakerId) {
        self.state.send_modify(|s| {
            s.active_speaker = Some(speaker.clone());
            s.is_narrating = true;
        });
    }

    pub fn finish_turn(&self) {
        self.state.send_modify(|s| {
            s.active_speaker = None;
            s.is_narrating = false;
        });
    }

    pub fn set_active_speaker(&self, speaker: Option<SpeakerId>) {
        self.state.send_modify(|s| s.active_speaker = speaker);
    }

    pub fn mark_finished(&self) {
        self.state.send_modify(|s| {
            s.phase = Phase::Finished;
            s.is_class_finished = true;
            s.active_speaker = None;
            s.is_narrating = false;
            s.skip_requested = false;
            s.board.is_typing = false;
        });
    }

    pub fn set_heading(&self, heading: impl Into<String>) {
        let heading = heading.into();
        self.state.send_modify(|s| s.board.heading = heading);
    }

    pub fn set_board_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.state.send_modify(|s| s.board.text = text);
    }

    pub fn set_typing(&self, typing: bool) {
        self.state.send_modify(|s| s.board.is_typing = typing);
    }

    // --- Waits ---

    /// Resolves once playback is running or the class is ending.
    pub async fn wait_until_runnable(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|s| s.is_running || s.is_ending).await;
    }

    /// Resolves once the class is ending.
    pub async fn ending(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|s| s.is_ending).await;
    }

    /// Resolves on a skip request or the class ending.
    pub async fn interrupted(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|s| s.skip_requested || s.is_ending).await;
    }

    pub async fn finished(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|s| s.is_class_finished).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_starts_running_at_normal_speed() {
        let controls = PlaybackControls::new();
        let s = controls.snapshot();
        assert!(s.is_running);
        assert_eq!(s.speed, 1.0);
        assert_eq!(s.phase, Phase::AwaitingStart);
    }

    #[test]
    fn test_set_speed_rejects_non_positive_values() {
        let controls = PlaybackControls::new();
        assert_eq!(controls.set_speed(0.0), Err(ControlError::InvalidSpeed(0.0)));
        assert!(controls.set_speed(-1.0).is_err());
        assert!(controls.set_speed(f64::NAN).is_err());
        assert!(controls.set_speed(f64::INFINITY).is_err());
        controls.set_speed(1.75).unwrap();
        assert_eq!(controls.speed(), 1.75);
    }

    #[test]
    fn test_take_skip_is_edge_triggered() {
        let controls = PlaybackControls::new();
        assert!(!controls.take_skip());
        controls.skip();
        assert!(controls.skip_requested());
        assert!(controls.take_skip());
        assert!(!controls.take_skip());
    }

    #[test]
    fn test_end_class_is_monotonic_and_forces_running() {
        let controls = PlaybackControls::new();
        controls.pause();
        assert!(controls.end_class());
        assert!(!controls.end_class());
        assert!(controls.is_ending());
        assert!(controls.is_running());
        controls.pause();
        assert!(controls.is_running(), "pause is ignored once ending");
    }

    #[test]
    fn test_finished_state_is_sticky() {
        let controls = PlaybackControls::new();
        controls.mark_finished();
        controls.set_phase(Phase::RunningSlide);
        let s = controls.snapshot();
        assert!(s.is_class_finished);
        assert_eq!(s.phase, Phase::Finished);
        controls.skip();
        assert!(!controls.skip_requested());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_runnable_wakes_on_resume() {
        let controls = PlaybackControls::new();
        controls.pause();
        let waiter = {
            let controls = controls.clone();
            tokio::spawn(async move { controls.wait_until_runnable().await })
        };
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(!waiter.is_finished());
        controls.resume();
        tokio::time::timeout(Duration::from_millis(1), waiter)
            .await
            .expect("resume wakes the waiter")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_runnable_wakes_on_end_class() {
        let controls = PlaybackControls::new();
        controls.pause();
        let waiter = {
            let controls = controls.clone();
            tokio::spawn(async move { controls.wait_until_runnable().await })
        };
        tokio::task::yield_now().await;
        controls.end_class();
        tokio::time::timeout(Duration::from_millis(1), waiter)
            .await
            .expect("end_class wakes the waiter")
            .unwrap();
    }

    #[test]
    fn test_subscribers_see_intents() {
        let controls = PlaybackControls::new();
        let mut rx = controls.subscribe();
        controls.pause();
        assert!(rx.has_changed().unwrap());
        assert!(!rx.borrow_and_update().is_running);
    }
}
