#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Places the flying actor on the path every frame.
//!
//! The solver samples the path at the current progress, lifts the actor above
//! the curve with a gentle bob, eases its heading toward the direction of
//! travel, and banks it into turns. Once the finale is reached the actor stops
//! following the curve and tumbles out of the sky under gravity.

use glam::{Mat3, Quat, Vec3};
use serde::Deserialize;
use skyride_core::{smoothing_factor, Event, FinaleCause, FrameClock, PROGRESS_CAP};
use skyride_world::path::FlightPath;
use tracing::{debug, warn};

/// Tuning for the actor's flight and descent.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Height of the actor above the path.
    pub lift: f32,
    /// Amplitude of the vertical bob.
    pub bob_amplitude: f32,
    /// Angular frequency of the vertical bob, in radians per second.
    pub bob_frequency: f32,
    /// Parameter distance ahead of the actor used to derive its heading.
    pub look_ahead: f32,
    /// Largest parameter the actor is sampled at.
    pub sample_cap: f32,
    /// Per-frame easing applied to heading and roll.
    pub orientation_smoothing: f32,
    /// Parameter distance between the tangents compared for banking.
    pub bank_probe: f32,
    /// Roll produced per unit of lateral tangent change.
    pub bank_gain: f32,
    /// Largest roll angle in radians.
    pub max_bank: f32,
    /// Downward acceleration during the descent.
    pub gravity: f32,
    /// Forward drift during the descent, in units per second.
    pub descent_drift: f32,
    /// Nose-down rotation rate during the descent, in radians per second.
    pub descent_pitch_rate: f32,
    /// Roll rate during the descent, in radians per second.
    pub descent_roll_rate: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lift: 2.0,
            bob_amplitude: 0.4,
            bob_frequency: 2.5,
            look_ahead: 0.003,
            sample_cap: 0.998,
            orientation_smoothing: 0.08,
            bank_probe: 0.01,
            bank_gain: 40.0,
            max_bank: 0.6,
            gravity: 15.0,
            descent_drift: 5.0,
            descent_pitch_rate: 1.5,
            descent_roll_rate: 0.8,
        }
    }
}

/// Visual model used to draw the actor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActorModel {
    /// Model decoded from an external asset.
    Loaded {
        /// Asset name.
        name: String,
        /// Size of the decoded asset in bytes.
        byte_len: usize,
        /// Number of animation clips available.
        clip_count: usize,
    },
    /// Procedural stand-in built from primitives.
    Fallback,
}

/// Loading state of the actor's model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetSlot {
    /// The load has not completed.
    Pending,
    /// A model is available.
    Ready(ActorModel),
    /// The load failed; the fallback is substituted on the next update.
    Failed(String),
}

impl AssetSlot {
    /// Model in use, if one is available.
    #[must_use]
    pub fn model(&self) -> Option<&ActorModel> {
        match self {
            Self::Ready(model) => Some(model),
            Self::Pending | Self::Failed(_) => None,
        }
    }
}

/// Placement of the actor for a single frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActorPose {
    /// World position.
    pub position: Vec3,
    /// Orientation with the model's forward axis along local -Z.
    pub orientation: Quat,
    /// Bank angle folded into `orientation`.
    pub roll: f32,
    /// Seconds of animation playback while the model was ready.
    pub animation_time: f32,
}

#[derive(Clone, Copy, Debug)]
struct Descent {
    origin: Vec3,
    heading: Quat,
    elapsed: f32,
    pitch: f32,
    roll: f32,
}

#[derive(Clone, Copy, Debug)]
enum Motion {
    Following,
    DescentRequested,
    Descending(Descent),
}

/// Stateful solver for the actor's pose.
#[derive(Debug)]
pub struct ActorPoseSolver {
    config: Config,
    asset: AssetSlot,
    heading: Option<Quat>,
    roll: f32,
    animation_time: f32,
    motion: Motion,
    last_pose: Option<ActorPose>,
}

impl ActorPoseSolver {
    /// Creates a solver waiting for its model to load.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            asset: AssetSlot::Pending,
            heading: None,
            roll: 0.0,
            animation_time: 0.0,
            motion: Motion::Following,
            last_pose: None,
        }
    }

    /// Loading state of the actor's model.
    #[must_use]
    pub const fn asset(&self) -> &AssetSlot {
        &self.asset
    }

    /// Records the outcome of the model load.
    pub fn finish_loading(&mut self, result: Result<ActorModel, String>) {
        self.asset = match result {
            Ok(model) => {
                debug!(?model, "actor model ready");
                AssetSlot::Ready(model)
            }
            Err(reason) => AssetSlot::Failed(reason),
        };
    }

    /// Pose produced by the most recent update.
    #[must_use]
    pub const fn last_pose(&self) -> Option<ActorPose> {
        self.last_pose
    }

    /// Reports whether the actor has left the path.
    #[must_use]
    pub const fn is_descending(&self) -> bool {
        !matches!(self.motion, Motion::Following)
    }

    /// Switches to the descent once the finale is reached.
    pub fn handle(&mut self, events: &[Event]) {
        for event in events {
            let reached = matches!(
                event,
                Event::FinaleTriggered {
                    cause: FinaleCause::Reached
                }
            );
            if !reached || !matches!(self.motion, Motion::Following) {
                continue;
            }
            self.motion = match self.last_pose {
                Some(pose) => Motion::Descending(self.begin_descent(pose)),
                None => Motion::DescentRequested,
            };
            debug!("actor descent started");
        }
    }

    /// Computes the pose for the current frame.
    ///
    /// Returns `None` until the model has loaded; a failed load is replaced by
    /// the fallback model.
    pub fn update(
        &mut self,
        path: &FlightPath,
        progress: f32,
        clock: FrameClock,
    ) -> Option<ActorPose> {
        if !self.resolve_asset() {
            return None;
        }
        let dt = clock.delta().max(0.0);
        self.animation_time += dt;

        let pose = match self.motion {
            Motion::Following => self.follow(path, progress, clock),
            Motion::DescentRequested => {
                let pose = self.follow(path, progress, clock);
                self.motion = Motion::Descending(self.begin_descent(pose));
                pose
            }
            Motion::Descending(descent) => self.descend(descent, dt),
        };
        self.last_pose = Some(pose);
        Some(pose)
    }

    fn resolve_asset(&mut self) -> bool {
        match &self.asset {
            AssetSlot::Pending => return false,
            AssetSlot::Ready(_) => return true,
            AssetSlot::Failed(reason) => {
                warn!(%reason, "actor model failed to load, using fallback");
            }
        }
        self.asset = AssetSlot::Ready(ActorModel::Fallback);
        true
    }

    fn follow(&mut self, path: &FlightPath, progress: f32, clock: FrameClock) -> ActorPose {
        let config = &self.config;
        let t = if progress.is_finite() {
            progress.clamp(0.0, config.sample_cap)
        } else {
            0.0
        };
        let ahead = (t + config.look_ahead).min(PROGRESS_CAP);
        let base = path.position_at(t);
        let bob = (clock.elapsed() * config.bob_frequency).sin() * config.bob_amplitude;
        let position = base + Vec3::Y * (config.lift + bob);

        let target_heading = look_rotation(path.position_at(ahead) - base)
            .or(self.heading)
            .unwrap_or(Quat::IDENTITY);

        let probe = t + config.bank_probe;
        let lean = if probe < PROGRESS_CAP {
            path.tangent_at(t).cross(path.tangent_at(probe)).y
        } else {
            0.0
        };
        let target_roll = (lean * config.bank_gain).clamp(-config.max_bank, config.max_bank);

        let (heading, roll) = match self.heading {
            None => (target_heading, target_roll),
            Some(previous) => {
                let factor = smoothing_factor(config.orientation_smoothing, clock.delta());
                (
                    previous.slerp(target_heading, factor).normalize(),
                    self.roll + (target_roll - self.roll) * factor,
                )
            }
        };
        self.heading = Some(heading);
        self.roll = roll;

        ActorPose {
            position,
            orientation: heading * Quat::from_rotation_z(roll),
            roll,
            animation_time: self.animation_time,
        }
    }

    fn begin_descent(&self, pose: ActorPose) -> Descent {
        Descent {
            origin: pose.position,
            heading: self.heading.unwrap_or(Quat::IDENTITY),
            elapsed: 0.0,
            pitch: 0.0,
            roll: self.roll,
        }
    }

    fn descend(&mut self, mut descent: Descent, dt: f32) -> ActorPose {
        let config = &self.config;
        descent.elapsed += dt;
        descent.pitch += config.descent_pitch_rate * dt;
        descent.roll += config.descent_roll_rate * dt;

        let fall = 0.5 * config.gravity * descent.elapsed * descent.elapsed;
        let drift = config.descent_drift * descent.elapsed;
        let position = descent.origin + Vec3::new(0.0, -fall, -drift);
        let orientation = descent.heading
            * Quat::from_rotation_x(-descent.pitch)
            * Quat::from_rotation_z(descent.roll);

        self.motion = Motion::Descending(descent);
        ActorPose {
            position,
            orientation,
            roll: descent.roll,
            animation_time: self.animation_time,
        }
    }
}

/// Rotation that points local -Z along `direction` while keeping +Y up.
fn look_rotation(direction: Vec3) -> Option<Quat> {
    let forward = direction.try_normalize()?;
    let Some(right) = forward.cross(Vec3::Y).try_normalize() else {
        return Some(Quat::from_rotation_arc(Vec3::NEG_Z, forward));
    };
    let up = right.cross(forward);
    Some(Quat::from_mat3(&Mat3::from_cols(right, up, -forward)))
}
