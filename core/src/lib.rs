#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Skyride engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.
//!
//! Everything downstream reads a single normalized progress scalar. The
//! [`SegmentLayout`] type maps that scalar onto themed segments so every
//! consumer agrees on which segment is current.

use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Highest progress value the simulation may reach.
///
/// Curve sampling requires `t < 1`, so progress saturates just below it.
pub const PROGRESS_CAP: f32 = 0.999;

/// Frame rate at which per-frame smoothing constants were tuned.
pub const REFERENCE_FRAME_RATE: f32 = 60.0;

/// Duration of a single frame at [`REFERENCE_FRAME_RATE`].
pub const REFERENCE_FRAME: Duration = Duration::from_nanos(16_666_667);

/// Describes the active mode of the journey.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayMode {
    /// The journey has been constructed but not started.
    Idle,
    /// Progress advances along the path under the pacing table.
    Flying,
    /// Progress is frozen; speed is retained for when play resumes.
    Paused,
    /// An external mode holds control; the clock decelerates toward zero.
    Interlude,
    /// The terminal cinematic is playing; progression has stopped.
    Finale,
    /// Control has been surrendered to an external mode.
    Handoff,
}

impl PlayMode {
    /// Reports whether the progress clock advances while in this mode.
    #[must_use]
    pub const fn advances_clock(self) -> bool {
        matches!(self, Self::Flying | Self::Interlude | Self::Finale)
    }
}

/// Reason a finale transition was requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FinaleCause {
    /// The actor reached the near-end threshold of the path.
    Reached,
    /// The viewer asked to skip straight to the finale.
    Skipped,
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Starts the journey from the idle state.
    Begin,
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Sets the speed the progress clock smoothly approaches.
    SetTargetSpeed {
        /// Desired normalized progress per second. Negative values clamp to zero.
        speed: f32,
    },
    /// Freezes progression without discarding the current speed.
    Pause,
    /// Resumes progression after a pause.
    Resume,
    /// Hands control to an external mode while the clock decelerates.
    BeginInterlude,
    /// Returns control to the journey after an interlude.
    EndInterlude,
    /// Opens the gate marker associated with a segment boundary.
    OpenGate {
        /// Gate to open.
        gate: GateId,
    },
    /// Displays the title of a segment.
    AnnounceSegment {
        /// Segment whose title should be shown.
        segment: SegmentIndex,
    },
    /// Requests a celebratory particle burst at a world position.
    RequestBurst {
        /// World-space origin of the burst.
        position: Vec3,
    },
    /// Requests a camera shake with the provided amplitude.
    ShakeCamera {
        /// Shake amplitude in world units before scaling.
        amount: f32,
    },
    /// Ends progression and starts the terminal transition.
    TriggerFinale {
        /// Why the finale was requested.
        cause: FinaleCause,
    },
    /// Cancels pending timers and stops processing further ticks.
    Shutdown,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that the journey started.
    JourneyStarted,
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
        /// Simulation clock after the tick was applied.
        clock: FrameClock,
    },
    /// Reports that progress moved during a tick.
    ProgressAdvanced {
        /// Progress before the tick.
        from: f32,
        /// Progress after the tick.
        to: f32,
    },
    /// Announces that progress crossed into a new segment.
    SegmentEntered {
        /// Segment that became current.
        segment: SegmentIndex,
    },
    /// Reports that progress saturated at [`PROGRESS_CAP`].
    PathEndReached,
    /// Confirms a new target speed.
    TargetSpeedChanged {
        /// Target speed stored by the clock.
        speed: f32,
    },
    /// Announces that the journey entered a new play mode.
    PlayModeChanged {
        /// Mode that became active after processing commands.
        mode: PlayMode,
    },
    /// Confirms that a gate marker opened.
    GateOpened {
        /// Gate that opened.
        gate: GateId,
        /// World position of the gate marker.
        position: Vec3,
    },
    /// Confirms that a segment title is being displayed.
    SegmentAnnounced {
        /// Segment being announced.
        segment: SegmentIndex,
    },
    /// Reports that a segment title display timed out.
    AnnouncementExpired {
        /// Segment whose title was removed.
        segment: SegmentIndex,
    },
    /// Requests a celebratory particle burst from the presentation layer.
    BurstRequested {
        /// World-space origin of the burst.
        position: Vec3,
    },
    /// Requests a camera shake from the camera controller.
    CameraShakeRequested {
        /// Shake amplitude in world units before scaling.
        amount: f32,
    },
    /// Confirms that the finale started.
    FinaleTriggered {
        /// Why the finale was requested.
        cause: FinaleCause,
    },
    /// Signals that the journey surrendered control to an external mode.
    HandoffRequested,
    /// Confirms that the world stopped processing ticks.
    ShutDown,
}

/// Zero-based ordinal of a themed segment along the path.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SegmentIndex(u32);

impl SegmentIndex {
    /// Creates a new segment index.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric value of the index.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Index as a `usize`, suitable for slice access.
    #[must_use]
    pub const fn as_usize(&self) -> usize {
        self.0 as usize
    }

    /// Index of the following segment.
    #[must_use]
    pub const fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Identifier of a gate placed at the boundary between two segments.
///
/// Gate `g` separates segment `g` from segment `g + 1`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct GateId(u32);

impl GateId {
    /// Creates a new gate identifier.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric value of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Segment that begins once the gate is passed.
    #[must_use]
    pub const fn opens_segment(&self) -> SegmentIndex {
        SegmentIndex::new(self.0.saturating_add(1))
    }
}

/// Explicit simulation clock threaded through every per-frame update.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameClock {
    elapsed: f32,
    delta: f32,
}

impl FrameClock {
    /// Creates a clock snapshot from elapsed and delta seconds.
    #[must_use]
    pub const fn new(elapsed: f32, delta: f32) -> Self {
        Self { elapsed, delta }
    }

    /// Seconds of simulated time since the journey was constructed.
    #[must_use]
    pub const fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Seconds of simulated time covered by the current frame.
    #[must_use]
    pub const fn delta(&self) -> f32 {
        self.delta
    }
}

/// Maps overall progress onto the themed segments of the path.
///
/// The main segments occupy the first `main_fraction` of progress and the
/// epilogue tail occupies the rest. Segment space rescales the main portion
/// to `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegmentLayout {
    segment_count: u32,
    main_fraction: f32,
}

impl SegmentLayout {
    /// Creates a layout from a segment count and the main-path fraction.
    ///
    /// A zero segment count is treated as one; the fraction is clamped to
    /// `(0, 1]`.
    #[must_use]
    pub fn new(segment_count: u32, main_fraction: f32) -> Self {
        let main_fraction = if main_fraction.is_finite() && main_fraction > 0.0 {
            main_fraction.min(1.0)
        } else {
            1.0
        };
        Self {
            segment_count: segment_count.max(1),
            main_fraction,
        }
    }

    /// Number of themed segments.
    #[must_use]
    pub const fn segment_count(&self) -> u32 {
        self.segment_count
    }

    /// Share of overall progress covered by the themed segments.
    #[must_use]
    pub const fn main_fraction(&self) -> f32 {
        self.main_fraction
    }

    /// Rescales overall progress so the themed segments span `[0, 1]`.
    #[must_use]
    pub fn segment_space(&self, progress: f32) -> f32 {
        (progress.max(0.0) / self.main_fraction).min(1.0)
    }

    /// Segment containing the provided progress, clamped to the last one.
    ///
    /// Segment `s` is entered exactly when progress reaches
    /// [`segment_start`](Self::segment_start)`(s)`, the same threshold its
    /// gate is armed with.
    #[must_use]
    pub fn segment_at(&self, progress: f32) -> SegmentIndex {
        let mut segment = segment_for(self.segment_space(progress), self.segment_count);
        // The bucket estimate can land one off a boundary after rounding.
        while segment.get() > 0 && progress < self.segment_start(segment) {
            segment = SegmentIndex::new(segment.get() - 1);
        }
        while segment.get() + 1 < self.segment_count
            && progress >= self.segment_start(segment.next())
        {
            segment = segment.next();
        }
        segment
    }

    /// Fraction of the current segment that has been traversed.
    #[must_use]
    pub fn local_progress(&self, progress: f32) -> f32 {
        let scaled = self.segment_space(progress) * self.segment_count as f32;
        let current = self.segment_at(progress).get() as f32;
        (scaled - current).clamp(0.0, 1.0)
    }

    /// Overall progress at which the provided segment begins.
    #[must_use]
    pub fn segment_start(&self, segment: SegmentIndex) -> f32 {
        segment.get() as f32 / self.segment_count as f32 * self.main_fraction
    }
}

/// Maps a value in `[0, 1]` onto one of `count` equal buckets.
///
/// The result is clamped to `[0, count - 1]`; negative input maps to zero.
#[must_use]
pub fn segment_for(fraction: f32, count: u32) -> SegmentIndex {
    let count = count.max(1);
    let scaled = (fraction.max(0.0) * count as f32).floor();
    let index = if scaled.is_finite() { scaled as u32 } else { 0 };
    SegmentIndex::new(index.min(count - 1))
}

/// Converts a per-frame smoothing constant into a factor for `dt` seconds.
///
/// At the reference frame rate this returns `per_frame` unchanged; other
/// frame rates produce the same convergence per second.
#[must_use]
pub fn smoothing_factor(per_frame: f32, dt: f32) -> f32 {
    let per_frame = per_frame.clamp(0.0, 1.0);
    if dt <= 0.0 {
        return 0.0;
    }
    1.0 - (1.0 - per_frame).powf(dt * REFERENCE_FRAME_RATE)
}
