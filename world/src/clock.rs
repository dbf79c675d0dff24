//! Smoothed progress clock.

use serde::Deserialize;
use skyride_core::{smoothing_factor, PROGRESS_CAP};

/// Tuning for the progress clock.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Fraction of the speed gap closed per 60 Hz frame.
    pub smoothing: f32,
    /// Target speed applied when the journey begins.
    pub initial_target_speed: f32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            smoothing: 0.02,
            initial_target_speed: 0.012,
        }
    }
}

/// Outcome of advancing the clock by one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClockStep {
    /// Progress before the frame.
    pub from: f32,
    /// Progress after the frame.
    pub to: f32,
    /// Whether progress sits at the cap after the frame.
    pub capped: bool,
}

/// Normalized progress driven by a speed that eases toward a target.
///
/// The speed is never negative, so progress never decreases.
#[derive(Clone, Debug, PartialEq)]
pub struct ProgressClock {
    progress: f32,
    speed: f32,
    target_speed: f32,
    smoothing: f32,
}

impl ProgressClock {
    /// Creates a stopped clock at the start of the path.
    #[must_use]
    pub fn new(smoothing: f32) -> Self {
        Self {
            progress: 0.0,
            speed: 0.0,
            target_speed: 0.0,
            smoothing: smoothing.clamp(0.0, 1.0),
        }
    }

    /// Current progress in `[0, PROGRESS_CAP]`.
    #[must_use]
    pub const fn progress(&self) -> f32 {
        self.progress
    }

    /// Current speed in progress per second.
    #[must_use]
    pub const fn speed(&self) -> f32 {
        self.speed
    }

    /// Speed the clock is easing toward.
    #[must_use]
    pub const fn target_speed(&self) -> f32 {
        self.target_speed
    }

    /// Stores a new target speed. Negative and non-finite values become zero.
    pub fn set_target_speed(&mut self, speed: f32) {
        self.target_speed = if speed.is_finite() { speed.max(0.0) } else { 0.0 };
    }

    /// Stops motion immediately and clears the target.
    pub fn halt(&mut self) {
        self.speed = 0.0;
        self.target_speed = 0.0;
    }

    /// Eases speed toward the target and integrates progress over `dt` seconds.
    pub fn advance(&mut self, dt: f32) -> ClockStep {
        let from = self.progress;
        if !(dt.is_finite() && dt > 0.0) {
            return ClockStep {
                from,
                to: from,
                capped: from >= PROGRESS_CAP,
            };
        }

        self.speed += (self.target_speed - self.speed) * smoothing_factor(self.smoothing, dt);
        self.progress += self.speed * dt;

        let capped = self.progress >= PROGRESS_CAP;
        if capped {
            self.progress = PROGRESS_CAP;
            self.speed = 0.0;
        }

        ClockStep {
            from,
            to: self.progress,
            capped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: f32 = 1.0 / 60.0;

    #[test]
    fn speed_eases_toward_target() {
        let mut clock = ProgressClock::new(0.02);
        clock.set_target_speed(0.012);
        let _ = clock.advance(FRAME);
        assert!((clock.speed() - 0.012 * 0.02).abs() < 1e-7);
        assert!(clock.speed() < clock.target_speed());
    }

    #[test]
    fn saturates_at_cap_and_stops() {
        let mut clock = ProgressClock::new(1.0);
        clock.set_target_speed(10.0);
        let step = clock.advance(1.0);
        assert!(step.capped);
        assert_eq!(clock.progress(), PROGRESS_CAP);
        assert_eq!(clock.speed(), 0.0);
    }

    #[test]
    fn negative_targets_are_clamped() {
        let mut clock = ProgressClock::new(0.5);
        clock.set_target_speed(-3.0);
        assert_eq!(clock.target_speed(), 0.0);
        clock.set_target_speed(f32::NAN);
        assert_eq!(clock.target_speed(), 0.0);
        let step = clock.advance(FRAME);
        assert_eq!(step.from, step.to);
    }

    #[test]
    fn non_positive_dt_leaves_state_untouched() {
        let mut clock = ProgressClock::new(0.02);
        clock.set_target_speed(0.5);
        let before = clock.clone();
        let step = clock.advance(0.0);
        assert_eq!(clock, before);
        assert!(!step.capped);
    }

    #[test]
    fn halt_zeroes_speed_and_target() {
        let mut clock = ProgressClock::new(0.5);
        clock.set_target_speed(0.1);
        for _ in 0..30 {
            let _ = clock.advance(FRAME);
        }
        clock.halt();
        let step = clock.advance(FRAME);
        assert_eq!(step.from, step.to);
    }
}
