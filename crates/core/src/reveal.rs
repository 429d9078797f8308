//! Progressive, character-by-character text display on the shared board.

use crate::{playback::PlaybackControls, timing::Timings};
use std::sync::Arc;

/// Reveals text on the board at a rate driven by the live playback speed.
///
/// A reveal can be cut short (skip or end-class snaps the board to the full
/// text) but never discarded: it always finishes with the complete string on
/// the board and the typing indicator off.
#[derive(Debug, Clone)]
pub struct TextReveal {
    controls: PlaybackControls,
    timings: Arc<Timings>,
}

impl TextReveal {
    pub fn new(controls: PlaybackControls, timings: Arc<Timings>) -> Self {
        Self { controls, timings }
    }

    pub async fn run(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.controls.set_typing(true);
        self.controls.set_board_text("");
        tokio::time::sleep(self.timings.reveal_settle).await;

        let mut shown = String::with_capacity(text.len());
        for ch in text.chars() {
            if self.controls.should_snap() {
                self.controls.set_board_text(text);
                break;
            }
            shown.push(ch);
            self.controls.set_board_text(shown.clone());
            // Read fresh so a speed change mid-reveal applies to the next tick.
            let delay = self.timings.char_delay(self.controls.speed());
            tokio::time::sleep(delay).await;
        }

        self.controls.set_typing(false);
    }

    /// Shows the final text at once.
    pub fn snap(&self, text: &str) {
        self.controls.set_board_text(text);
        self.controls.set_typing(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::Instant;

    fn reveal() -> (TextReveal, PlaybackControls) {
        let controls = PlaybackControls::new();
        (
            TextReveal::new(controls.clone(), Arc::new(Timings::default())),
            controls,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_text_is_a_no_op() {
        let (reveal, controls) = reveal();
        controls.set_board_text("previous");
        let start = Instant::now();
        reveal.run("").await;
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(controls.snapshot().board.text, "previous");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reveals_full_text_at_base_rate() {
        let (reveal, controls) = reveal();
        let start = Instant::now();
        reveal.run("Hello").await;
        // 200ms settle + 5 * 28ms
        assert_eq!(start.elapsed(), Duration::from_millis(340));
        let board = controls.snapshot().board;
        assert_eq!(board.text, "Hello");
        assert!(!board.is_typing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_faster_speed_never_slower_and_respects_floor() {
        let text = "x".repeat(40);
        let mut previous = Duration::MAX;
        for speed in [0.5, 1.0, 2.0, 10.0, 1000.0] {
            let (reveal, controls) = reveal();
            controls.set_speed(speed).unwrap();
            let start = Instant::now();
            reveal.run(&text).await;
            let elapsed = start.elapsed() - Duration::from_millis(200);
            assert!(elapsed <= previous, "speed {speed} was slower");
            assert!(elapsed >= Duration::from_millis(5 * 40));
            previous = elapsed;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_mid_reveal_snaps_to_full_text() {
        let (reveal, controls) = reveal();
        let text = "The quick brown fox jumps over the lazy dog";
        let task = {
            let reveal = reveal.clone();
            let text = text.to_string();
            tokio::spawn(async move { reveal.run(&text).await })
        };
        tokio::time::sleep(Duration::from_millis(300)).await;
        let partial = controls.snapshot().board.text;
        assert!(!partial.is_empty() && partial.len() < text.len());

        controls.skip();
        tokio::time::timeout(Duration::from_millis(30), task)
            .await
            .expect("reveal exits within one tick")
            .unwrap();
        let board = controls.snapshot().board;
        assert_eq!(board.text, text);
        assert!(!board.is_typing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_speed_change_applies_mid_reveal() {
        let (reveal, controls) = reveal();
        let text = "y".repeat(20);
        let task = {
            let reveal = reveal.clone();
            let text = text.clone();
            tokio::spawn(async move { reveal.run(&text).await })
        };
        let start = Instant::now();
        // settle + a few ticks at speed 1, then jump to the floor
        tokio::time::sleep(Duration::from_millis(200 + 28 * 2)).await;
        controls.set_speed(100.0).unwrap();
        task.await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(200 + 28 * 20));
        assert_eq!(controls.snapshot().board.text, text);
    }

    #[test]
    fn test_snap_shows_final_text() {
        let (reveal, controls) = reveal();
        controls.set_typing(true);
        reveal.snap("done");
        let board = controls.snapshot().board;
        assert_eq!(board.text, "done");
        assert!(!board.is_typing);
    }
}
