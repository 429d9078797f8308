use std::time::Duration;

/// Pacing constants for a classroom session.
#[derive(Debug, Clone, PartialEq)]
pub struct Timings {
    /// Pause after each completed turn, divided by the playback speed.
    pub turn_pacing: Duration,
    /// Blank-board pause before each slide.
    pub slide_preroll: Duration,
    /// Wait after clearing the board before the first character appears.
    pub reveal_settle: Duration,
    /// Per-character delay at speed 1.
    pub reveal_char: Duration,
    /// Lower bound on the per-character delay.
    pub reveal_char_floor: Duration,
    /// Gap between consecutive observer replies.
    pub observer_reply_gap: Duration,
    /// Number of transcript entries sent as observer context.
    pub observer_context: usize,
    pub reaction_lifetime: Duration,
    /// Hard limit for fetching a clip ahead of playback.
    pub prefetch_timeout: Duration,
    /// Hard limit for playing a pre-fetched clip.
    pub clip_timeout: Duration,
    /// Hard limit for a direct "speak now" call.
    pub speech_timeout: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            turn_pacing: Duration::from_millis(300),
            slide_preroll: Duration::from_millis(150),
            reveal_settle: Duration::from_millis(200),
            reveal_char: Duration::from_millis(28),
            reveal_char_floor: Duration::from_millis(5),
            observer_reply_gap: Duration::from_millis(400),
            observer_context: 4,
            reaction_lifetime: Duration::from_secs(4),
            prefetch_timeout: Duration::from_secs(15),
            clip_timeout: Duration::from_secs(60),
            speech_timeout: Duration::from_secs(40),
        }
    }
}

impl Timings {
    /// `base / speed`, saturating at `Duration::MAX`; a non-positive speed
    /// leaves the base untouched.
    pub fn scaled(base: Duration, speed: f64) -> Duration {
        if speed <= 0.0 || !speed.is_finite() {
            return base;
        }
        Duration::try_from_secs_f64(base.as_secs_f64() / speed).unwrap_or(Duration::MAX)
    }

    /// Per-character reveal delay: `max(floor, floor_ms(base / speed))`.
    pub fn char_delay(&self, speed: f64) -> Duration {
        let base_ms = self.reveal_char.as_millis() as f64;
        let ms = if speed > 0.0 && speed.is_finite() {
            (base_ms / speed).floor()
        } else {
            base_ms
        };
        Duration::from_millis(ms as u64).max(self.reveal_char_floor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_delay_matches_observed_values() {
        let t = Timings::default();
        assert_eq!(t.char_delay(1.0), Duration::from_millis(28));
        assert_eq!(t.char_delay(2.0), Duration::from_millis(14));
        assert_eq!(t.char_delay(0.5), Duration::from_millis(56));
        // floor(28 / 3) = 9
        assert_eq!(t.char_delay(3.0), Duration::from_millis(9));
        assert_eq!(t.char_delay(100.0), Duration::from_millis(5));
    }

    #[test]
    fn test_char_delay_is_non_increasing_in_speed() {
        let t = Timings::default();
        let speeds = [0.25, 0.5, 0.75, 1.0, 1.5, 2.0, 4.0, 8.0, 64.0];
        for pair in speeds.windows(2) {
            assert!(t.char_delay(pair[0]) >= t.char_delay(pair[1]));
        }
    }

    #[test]
    fn test_scaled_divides_by_speed() {
        let base = Duration::from_millis(300);
        assert_eq!(Timings::scaled(base, 2.0), Duration::from_millis(150));
        assert_eq!(Timings::scaled(base, 0.5), Duration::from_millis(600));
        assert_eq!(Timings::scaled(base, 0.0), base);
    }

    #[test]
    fn test_extreme_speeds_do_not_overflow() {
        let base = Duration::from_millis(300);
        assert_eq!(Timings::scaled(base, 1e-30), Duration::MAX);
        assert_eq!(Timings::scaled(base, f64::MIN_POSITIVE), Duration::MAX);
        assert_eq!(Timings::scaled(base, 1e30), Duration::ZERO);

        let t = Timings::default();
        assert!(t.char_delay(1e-30) >= Duration::from_secs(3600));
        assert_eq!(t.char_delay(1e30), t.reveal_char_floor);
    }
}
