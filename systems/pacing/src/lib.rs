#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-segment pacing for the progress clock.
//!
//! Each themed segment has a cruising speed. The system requests it when the
//! journey starts, when a new segment is entered, and when flight resumes
//! after a pause or interlude.

use serde::Deserialize;
use skyride_core::{Command, Event, PlayMode, SegmentIndex};
use tracing::debug;

/// Cruising speeds for each segment, in normalized progress per second.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    segment_speeds: Vec<f32>,
}

impl Config {
    /// Creates a pacing table. Segments past the end reuse the last entry.
    #[must_use]
    pub fn new(segment_speeds: Vec<f32>) -> Self {
        Self { segment_speeds }
    }

    /// Configured speeds in segment order.
    #[must_use]
    pub fn segment_speeds(&self) -> &[f32] {
        &self.segment_speeds
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(vec![0.012, 0.013, 0.014, 0.011, 0.013, 0.010])
    }
}

/// Pure system that sets the target speed for the active segment.
#[derive(Debug)]
pub struct Pacing {
    speeds: Vec<f32>,
    play_mode: PlayMode,
    segment: SegmentIndex,
}

impl Pacing {
    /// Creates the system in the idle state.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            speeds: config.segment_speeds,
            play_mode: PlayMode::Idle,
            segment: SegmentIndex::new(0),
        }
    }

    /// Cruising speed for a segment; zero when the table is empty.
    #[must_use]
    pub fn speed_for(&self, segment: SegmentIndex) -> f32 {
        self.speeds
            .get(segment.as_usize())
            .or_else(|| self.speeds.last())
            .copied()
            .unwrap_or(0.0)
    }

    /// Consumes world events and emits at most one speed command per batch.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        let mut refresh = false;
        for event in events {
            match event {
                Event::JourneyStarted => {
                    self.segment = SegmentIndex::new(0);
                    refresh = true;
                }
                Event::SegmentEntered { segment } => {
                    self.segment = *segment;
                    refresh = true;
                }
                Event::PlayModeChanged { mode } => {
                    refresh |= *mode == PlayMode::Flying && self.play_mode != PlayMode::Flying;
                    self.play_mode = *mode;
                }
                _ => {}
            }
        }

        if refresh && self.play_mode == PlayMode::Flying {
            let speed = self.speed_for(self.segment);
            debug!(segment = self.segment.get(), speed, "pacing segment");
            out.push(Command::SetTargetSpeed { speed });
        }
    }
}
