#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Trailing camera that follows the actor along the path.
//!
//! The camera sits a fixed parameter distance behind the actor's path sample,
//! above the path, and eases toward that anchor every frame. Shake requests add a decaying jitter
//! on top of the smoothed position. When the finale is reached the camera
//! detaches from the path and chases the falling actor instead.

use glam::Vec3;
use serde::Deserialize;
use skyride_core::{smoothing_factor, Event, FinaleCause, FrameClock, PROGRESS_CAP};
use skyride_world::path::FlightPath;
use tracing::debug;

/// Camera framing and smoothing parameters.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Parameter distance the camera trails behind the actor.
    pub follow_distance: f32,
    /// Height of the camera above the path.
    pub height_offset: f32,
    /// Amplitude of the vertical sway.
    pub sway_amplitude: f32,
    /// Angular frequency of the vertical sway, in radians per second.
    pub sway_frequency: f32,
    /// Height above the path sample that the camera looks at.
    pub look_lift: f32,
    /// Per-frame easing of the camera position.
    pub position_smoothing: f32,
    /// Per-frame easing of the look-at point.
    pub look_smoothing: f32,
    /// Scale applied to the shake amplitude before it moves the camera.
    pub shake_scale: f32,
    /// Scaled shake below which no jitter is applied.
    pub shake_threshold: f32,
    /// Exponential decay rate of the shake amplitude, per second.
    pub shake_decay: f32,
    /// Offset from the actor held while chasing the descent.
    pub chase_offset: Vec3,
    /// Per-frame easing while chasing the descent.
    pub chase_smoothing: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            follow_distance: 0.012,
            height_offset: 6.0,
            sway_amplitude: 0.3,
            sway_frequency: 0.8,
            look_lift: 2.5,
            position_smoothing: 0.06,
            look_smoothing: 0.08,
            shake_scale: 0.08,
            shake_threshold: 0.01,
            shake_decay: 4.0,
            chase_offset: Vec3::new(8.0, 5.0, 15.0),
            chase_smoothing: 0.03,
        }
    }
}

/// Camera placement for a single frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraTransform {
    /// Eye position.
    pub position: Vec3,
    /// Point the camera looks at.
    pub look_at: Vec3,
}

/// How the camera chooses its anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CameraMode {
    /// Trailing the actor along the path.
    Trailing,
    /// Chasing the actor after it leaves the path.
    Chase,
}

/// Stateful controller producing a smoothed camera transform.
#[derive(Debug)]
pub struct CameraController {
    config: Config,
    mode: CameraMode,
    position: Option<Vec3>,
    look_at: Vec3,
    shake: f32,
    trailing_parameter: f32,
}

impl CameraController {
    /// Creates a controller that snaps to its first target.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            mode: CameraMode::Trailing,
            position: None,
            look_at: Vec3::ZERO,
            shake: 0.0,
            trailing_parameter: 0.0,
        }
    }

    /// Current framing mode.
    #[must_use]
    pub const fn mode(&self) -> CameraMode {
        self.mode
    }

    /// Path parameter the camera anchored to on the latest trailing update.
    #[must_use]
    pub const fn trailing_parameter(&self) -> f32 {
        self.trailing_parameter
    }

    /// Current shake amplitude before scaling.
    #[must_use]
    pub const fn shake_amplitude(&self) -> f32 {
        self.shake
    }

    /// Raises the shake amplitude; weaker requests never reduce it.
    pub fn add_shake(&mut self, amount: f32) {
        if amount.is_finite() {
            self.shake = self.shake.max(amount);
        }
    }

    /// Reacts to shake requests and the finale.
    pub fn handle(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::CameraShakeRequested { amount } => self.add_shake(*amount),
                Event::FinaleTriggered {
                    cause: FinaleCause::Reached,
                } if self.mode == CameraMode::Trailing => {
                    debug!("camera switched to chase");
                    self.mode = CameraMode::Chase;
                }
                _ => {}
            }
        }
    }

    /// Computes the camera transform for the current frame.
    ///
    /// While trailing, the transform is derived from the path at `progress`;
    /// `actor_position` only anchors the chase framing.
    pub fn update(
        &mut self,
        path: &FlightPath,
        progress: f32,
        actor_position: Vec3,
        clock: FrameClock,
    ) -> CameraTransform {
        let dt = clock.delta().max(0.0);
        let (target_position, target_look, position_rate, look_rate) = match self.mode {
            CameraMode::Trailing => {
                let progress = if progress.is_finite() {
                    progress.clamp(0.0, PROGRESS_CAP)
                } else {
                    0.0
                };
                self.trailing_parameter = (progress - self.config.follow_distance).max(0.0);
                // Framed on the path itself so the actor's lift and bob stay visible.
                let anchor = path.position_at(progress);
                let behind = path.position_at(self.trailing_parameter);
                let sway = (clock.elapsed() * self.config.sway_frequency).sin()
                    * self.config.sway_amplitude;
                (
                    Vec3::new(
                        behind.x,
                        anchor.y + self.config.height_offset + sway,
                        behind.z,
                    ),
                    anchor + Vec3::Y * self.config.look_lift,
                    self.config.position_smoothing,
                    self.config.look_smoothing,
                )
            }
            CameraMode::Chase => (
                actor_position + self.config.chase_offset,
                actor_position,
                self.config.chase_smoothing,
                1.0,
            ),
        };

        let position = match self.position {
            None => {
                self.look_at = target_look;
                target_position
            }
            Some(previous) => {
                self.look_at = self
                    .look_at
                    .lerp(target_look, smoothing_factor(look_rate, dt));
                previous.lerp(target_position, smoothing_factor(position_rate, dt))
            }
        };
        self.position = Some(position);

        self.shake *= (-self.config.shake_decay * dt).exp();
        CameraTransform {
            position: position + self.jitter(clock.elapsed()),
            look_at: self.look_at,
        }
    }

    fn jitter(&self, elapsed: f32) -> Vec3 {
        let strength = self.shake * self.config.shake_scale;
        if strength <= self.config.shake_threshold {
            return Vec3::ZERO;
        }
        Vec3::new(
            (elapsed * 10.0).sin() * strength,
            (elapsed * 13.0).cos() * strength * 0.5,
            0.0,
        )
    }
}
